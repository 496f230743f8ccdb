//! Technology-balanced selection.
//!
//! Articles are assigned a primary technology from the domain's detection
//! table, their quality is adjusted by how crowded that technology is, and the
//! batch is chosen in three passes: one reserved slot per viable technology,
//! a hybrid-score fill, and a rebalance that enforces the dominance cap.

use crate::article::{CategorizedArticle, FilteredArticle, SelectedArticle};
use crate::config::DiversityConfig;
use crate::lexicon::Lexicon;
use crate::types::{Domain, SelectionReason};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

const TITLE_MATCH_SCORE: u32 = 3;
const TEXT_MATCH_SCORE: u32 = 1;
const SOURCE_HINT_SCORE: u32 = 5;
const GENERAL_FACTOR: f64 = 0.8;
const SMALL_SHARE_BONUS: f64 = 1.1;
const UNDERREPRESENTED_BELOW: f64 = 0.10;
const SMALL_SHARE_BELOW: f64 = 0.20;
const OVERREPRESENTED_ABOVE: f64 = 0.40;
const VERY_RARE_COUNT: usize = 2;
const RARE_COUNT: usize = 5;
const IMBALANCE_RATIO: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyStats {
    pub count: usize,
    pub avg_quality: f64,
    pub max_quality: f64,
    pub min_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityReport {
    pub total_articles: usize,
    pub categories_found: usize,
    pub by_technology: BTreeMap<String, TechnologyStats>,
    /// Non-general technologies present
    pub covered: usize,
    /// Size of the domain's detection table
    pub table_size: usize,
    pub coverage_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityValidation {
    pub is_diverse: bool,
    pub categories_count: usize,
    pub min_required: usize,
    pub categories: Vec<String>,
    pub distribution: BTreeMap<String, usize>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DiversityManager {
    lexicon: Arc<Lexicon>,
    config: DiversityConfig,
}

impl DiversityManager {
    pub fn new(lexicon: Arc<Lexicon>, config: DiversityConfig) -> Self {
        Self { lexicon, config }
    }

    pub fn config(&self) -> &DiversityConfig {
        &self.config
    }

    /// Categorize, score for diversity and select at most `target_count` articles
    pub fn ensure_diversity(
        &self,
        articles: Vec<FilteredArticle>,
        domain: Domain,
        target_count: usize,
    ) -> Vec<SelectedArticle> {
        let categorized = self.categorize(articles, domain);
        self.select(categorized, target_count)
    }

    pub fn categorize(&self, articles: Vec<FilteredArticle>, domain: Domain) -> Vec<CategorizedArticle> {
        let categorized: Vec<CategorizedArticle> = articles
            .into_iter()
            .map(|article| self.categorize_one(article, domain))
            .collect();

        let counts = technology_counts(&categorized);
        info!("Articles categorized for {}: {:?}", domain, counts);
        categorized
    }

    pub fn categorize_one(&self, article: FilteredArticle, domain: Domain) -> CategorizedArticle {
        let scored = article.into_inner();
        let title = scored.title().to_lowercase();
        let full_text = format!("{} {}", title, scored.text.to_lowercase());
        let hint = scored
            .source()
            .technology
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| self.lexicon.has_technology(domain, t));

        let mut technology_scores = BTreeMap::new();
        let mut primary: Option<(&str, u32)> = None;

        for technology in self.lexicon.technologies(domain) {
            let mut score = if hint.as_deref() == Some(technology.name.as_str()) {
                SOURCE_HINT_SCORE
            } else {
                0
            };
            for pattern in &technology.patterns {
                if pattern.is_match(&title) {
                    score += TITLE_MATCH_SCORE;
                } else if pattern.is_match(&full_text) {
                    score += TEXT_MATCH_SCORE;
                }
            }
            if score == 0 {
                continue;
            }
            technology_scores.insert(technology.name.clone(), score);
            // Ties go to the technology listed first
            if primary.map_or(true, |(_, best)| score > best) {
                primary = Some((technology.name.as_str(), score));
            }
        }

        let primary_technology = primary
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| CategorizedArticle::GENERAL.to_string());

        CategorizedArticle {
            scored,
            primary_technology,
            technology_scores,
        }
    }

    /// Multiplier applied to quality for a technology holding `count` of `total` articles
    pub fn diversity_factor(&self, technology: &str, count: usize, total: usize) -> f64 {
        if technology == CategorizedArticle::GENERAL {
            return GENERAL_FACTOR;
        }

        let ratio = if total > 0 { count as f64 / total as f64 } else { 0.0 };
        let share_factor = if ratio < UNDERREPRESENTED_BELOW {
            self.config.underrepresented_bonus
        } else if ratio < SMALL_SHARE_BELOW {
            SMALL_SHARE_BONUS
        } else if ratio > OVERREPRESENTED_ABOVE {
            self.config.overrepresented_penalty
        } else {
            1.0
        };

        let rarity_factor = if count <= VERY_RARE_COUNT {
            self.config.rare_tech_bonus
        } else if count <= RARE_COUNT {
            1.0 + (self.config.rare_tech_bonus - 1.0) / 2.0
        } else {
            1.0
        };

        share_factor * rarity_factor
    }

    /// Guarantee, fill and rebalance passes over already categorized articles
    pub fn select(&self, articles: Vec<CategorizedArticle>, target_count: usize) -> Vec<SelectedArticle> {
        if articles.is_empty() || target_count == 0 {
            return Vec::new();
        }

        let total = articles.len();
        let counts = technology_counts(&articles);
        let mut candidates: Vec<SelectedArticle> = articles
            .into_iter()
            .map(|article| {
                let count = counts.get(&article.primary_technology).copied().unwrap_or(0);
                let factor = self.diversity_factor(&article.primary_technology, count, total);
                SelectedArticle {
                    hybrid_score: article.quality_score() * factor,
                    categorized: article,
                    selection_reason: SelectionReason::HybridScore,
                }
            })
            .collect();
        // Stable, so equal hybrid scores keep input order
        candidates.sort_by(|a, b| by_hybrid_desc(a, b));

        let mut selected = self.guarantee_pass(&mut candidates, target_count);
        let guaranteed = selected.len();
        self.fill_pass(&mut selected, candidates, target_count);
        let filled = selected.len();
        self.rebalance_pass(&mut selected, target_count);

        selected.sort_by(by_hybrid_desc);
        selected.truncate(target_count);

        info!(
            "Selected {} articles ({} guaranteed, {} filled, {} dropped by rebalance)",
            selected.len(),
            guaranteed,
            filled - guaranteed,
            filled - selected.len().min(filled)
        );
        selected
    }

    /// Reserves the best article of every technology whose best article clears
    /// the guarantee threshold. Removes the reserved articles from `candidates`.
    fn guarantee_pass(&self, candidates: &mut Vec<SelectedArticle>, target_count: usize) -> Vec<SelectedArticle> {
        let mut best: HashMap<String, usize> = HashMap::new();
        for (index, candidate) in candidates.iter().enumerate() {
            if candidate.is_general() || candidate.quality_score() <= self.config.quality_threshold_guaranteed {
                continue;
            }
            let entry = best.entry(candidate.primary_technology.clone()).or_insert(index);
            if candidate.quality_score() > candidates[*entry].quality_score() {
                *entry = index;
            }
        }

        let mut reserved_indices: Vec<usize> = best.into_values().collect();
        // Candidates are in hybrid order, so index order is hybrid order
        reserved_indices.sort_unstable();
        reserved_indices.truncate(target_count);

        let mut reserved = Vec::with_capacity(reserved_indices.len());
        for index in reserved_indices.into_iter().rev() {
            let mut article = candidates.remove(index);
            article.selection_reason = SelectionReason::DiversityGuarantee;
            debug!("Reserved slot for {}: '{}'", article.primary_technology, article.title());
            reserved.push(article);
        }
        reserved.reverse();
        reserved
    }

    /// Adds candidates in hybrid order until the target is reached
    fn fill_pass(&self, selected: &mut Vec<SelectedArticle>, candidates: Vec<SelectedArticle>, target_count: usize) {
        let open = target_count.saturating_sub(selected.len());
        selected.extend(candidates.into_iter().take(open));
    }

    /// Drops the lowest-quality members of any technology holding more than
    /// its capped share of the target. The cap is computed once, up front, so
    /// the shrinking selection is never re-measured. `general` is exempt.
    fn rebalance_pass(&self, selected: &mut Vec<SelectedArticle>, target_count: usize) {
        let cap = self.dominance_cap(target_count);
        let counts = technology_counts(selected.iter().map(|s| &s.categorized));

        let mut dropped: Vec<usize> = Vec::new();
        for (technology, count) in counts {
            if technology == CategorizedArticle::GENERAL || count <= cap {
                continue;
            }
            let mut members: Vec<usize> = selected
                .iter()
                .enumerate()
                .filter(|(_, s)| s.primary_technology == technology)
                .map(|(index, _)| index)
                .collect();
            // Lowest quality first, later (lower hybrid) entries first on ties
            members.sort_by(|a, b| {
                selected[*a]
                    .quality_score()
                    .partial_cmp(&selected[*b].quality_score())
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.cmp(a))
            });
            debug!("{} holds {} of a {} cap, dropping {}", technology, count, cap, count - cap);
            dropped.extend(members.into_iter().take(count - cap));
        }

        dropped.sort_unstable_by(|a, b| b.cmp(a));
        for index in dropped {
            let removed = selected.remove(index);
            debug!("Rebalance dropped '{}' ({})", removed.title(), removed.primary_technology);
        }
    }

    fn dominance_cap(&self, target_count: usize) -> usize {
        ((self.config.max_tech_dominance * target_count as f64).floor() as usize).max(1)
    }

    pub fn report<'a, I>(&self, articles: I, domain: Domain) -> DiversityReport
    where
        I: IntoIterator<Item = &'a CategorizedArticle>,
    {
        let mut qualities: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut total_articles = 0;
        for article in articles {
            total_articles += 1;
            qualities
                .entry(article.primary_technology.clone())
                .or_default()
                .push(article.quality_score());
        }

        let by_technology: BTreeMap<String, TechnologyStats> = qualities
            .into_iter()
            .map(|(technology, scores)| {
                let count = scores.len();
                let stats = TechnologyStats {
                    count,
                    avg_quality: scores.iter().sum::<f64>() / count as f64,
                    max_quality: scores.iter().cloned().fold(f64::MIN, f64::max),
                    min_quality: scores.iter().cloned().fold(f64::MAX, f64::min),
                };
                (technology, stats)
            })
            .collect();

        let table_size = self.lexicon.technologies(domain).len();
        let covered = by_technology
            .keys()
            .filter(|t| t.as_str() != CategorizedArticle::GENERAL)
            .count();

        DiversityReport {
            total_articles,
            categories_found: by_technology.len(),
            by_technology,
            covered,
            table_size,
            coverage_percentage: if table_size > 0 {
                covered as f64 / table_size as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    pub fn validate_diversity(&self, selected: &[SelectedArticle], min_categories: usize) -> DiversityValidation {
        let distribution = technology_counts(selected.iter().map(|s| &s.categorized));
        let tech_counts: Vec<(&String, &usize)> = distribution
            .iter()
            .filter(|(technology, _)| technology.as_str() != CategorizedArticle::GENERAL)
            .collect();
        let categories: Vec<String> = tech_counts.iter().map(|(t, _)| (*t).clone()).collect();
        let is_diverse = categories.len() >= min_categories;

        let mut recommendations = Vec::new();
        if !is_diverse {
            recommendations.push(format!(
                "Increase diversity: only {} technologies detected, at least {} required",
                categories.len(),
                min_categories
            ));
        }
        let max = tech_counts.iter().map(|(_, c)| **c).max();
        let min = tech_counts.iter().map(|(_, c)| **c).min();
        if let (Some(max), Some(min)) = (max, min) {
            if max > min * IMBALANCE_RATIO {
                recommendations.push("Unbalanced distribution: some technologies are over-represented".to_string());
            }
        }

        DiversityValidation {
            is_diverse,
            categories_count: categories.len(),
            min_required: min_categories,
            categories,
            distribution,
            recommendations,
        }
    }
}

fn technology_counts<'a, I>(articles: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a CategorizedArticle>,
{
    let mut counts = BTreeMap::new();
    for article in articles {
        *counts.entry(article.primary_technology.clone()).or_insert(0) += 1;
    }
    counts
}

fn by_hybrid_desc(a: &SelectedArticle, b: &SelectedArticle) -> Ordering {
    b.hybrid_score.partial_cmp(&a.hybrid_score).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{EnrichedArticle, RawArticle, ScoreBreakdown, ScoredArticle, SourceProfile};
    use crate::types::ExtractionQuality;
    use rstest::rstest;

    fn manager() -> DiversityManager {
        DiversityManager::new(Arc::new(Lexicon::builtin().unwrap()), DiversityConfig::default())
    }

    fn filtered(title: &str, body: &str, quality: f64, source: SourceProfile) -> FilteredArticle {
        FilteredArticle(ScoredArticle {
            article: EnrichedArticle {
                raw: RawArticle::new(format!("https://example.com/{}", title.len()), title, source),
                text: body.to_string(),
                extraction_quality: ExtractionQuality::Full,
            },
            domain: Domain::Frontend,
            quality_score: quality,
            breakdown: ScoreBreakdown::default(),
        })
    }

    fn categorized(technology: &str, quality: f64, index: usize) -> CategorizedArticle {
        let article = filtered(&format!("{} article number {}", technology, index), "", quality, SourceProfile::new("s", 5.0));
        CategorizedArticle {
            scored: article.into_inner(),
            primary_technology: technology.to_string(),
            technology_scores: BTreeMap::new(),
        }
    }

    #[test]
    fn test_title_match_outweighs_body_match() {
        let article = filtered(
            "Vue 3.5 reactivity deep dive",
            "Comparisons with react hooks are included.",
            50.0,
            SourceProfile::new("Blog", 6.0),
        );
        let categorized = manager().categorize_one(article, Domain::Frontend);
        assert_eq!(categorized.primary_technology, "vue");
        assert_eq!(categorized.technology_scores.get("vue"), Some(&3));
        assert_eq!(categorized.technology_scores.get("react"), Some(&2));
    }

    #[test]
    fn test_source_hint_seeds_score() {
        let source = SourceProfile::new("Svelte Blog", 8.0).with_technology("svelte");
        let article = filtered("What is new this month", "Release notes and community links.", 50.0, source);
        let categorized = manager().categorize_one(article, Domain::Frontend);
        assert_eq!(categorized.primary_technology, "svelte");
        assert_eq!(categorized.technology_scores.get("svelte"), Some(&5));
    }

    #[test]
    fn test_no_match_is_general() {
        let article = filtered("Hiring trends for engineers", "A market overview.", 50.0, SourceProfile::new("News", 5.0));
        let categorized = manager().categorize_one(article, Domain::Frontend);
        assert!(categorized.is_general());
        assert!(categorized.technology_scores.is_empty());
    }

    #[test]
    fn test_diversity_factors() {
        let manager = manager();
        assert_eq!(manager.diversity_factor("general", 5, 10), 0.8);
        // 1 of 20: underrepresented and very rare
        assert!((manager.diversity_factor("vue", 1, 20) - 1.3 * 1.2).abs() < 1e-9);
        // 3 of 20: small share, rare
        assert!((manager.diversity_factor("vue", 3, 20) - 1.1 * 1.1).abs() < 1e-9);
        // 9 of 20: overrepresented, common
        assert!((manager.diversity_factor("react", 9, 20) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_guarantee_reserves_weak_technology() {
        let mut articles: Vec<CategorizedArticle> = (0..8).map(|i| categorized("react", 90.0 - i as f64, i)).collect();
        articles.push(categorized("css", 25.0, 100));
        articles.push(categorized("tooling", 15.0, 101));
        let selected = manager().select(articles, 4);
        assert!(selected.iter().any(|s| s.primary_technology() == "css"
            && s.selection_reason == SelectionReason::DiversityGuarantee));
        // below the guarantee threshold, so never reserved
        assert!(!selected.iter().any(|s| s.primary_technology() == "tooling"
            && s.selection_reason == SelectionReason::DiversityGuarantee));
        assert!(selected.iter().filter(|s| s.primary_technology() == "react").count() <= 2);
    }

    #[test]
    fn test_rebalance_drops_only_the_excess_over_the_cap() {
        let mut articles: Vec<CategorizedArticle> = (0..30).map(|i| categorized("react", 80.0 - i as f64, i)).collect();
        articles.extend((0..6).map(|i| categorized("vue", 40.0 - i as f64, 100 + i)));
        articles.extend((0..6).map(|i| categorized("css", 35.0 - i as f64, 200 + i)));

        // Fill takes 17 more react on hybrid rank, rebalance trims them to floor(0.5 * 20)
        let selected = manager().select(articles, 20);

        let react: Vec<f64> = selected
            .iter()
            .filter(|s| s.primary_technology() == "react")
            .map(|s| s.quality_score())
            .collect();
        assert_eq!(react.len(), 10);
        assert_eq!(selected.len(), 12);
        assert!(react.iter().all(|q| *q >= 71.0), "lowest-quality react kept: {:?}", react);
    }

    #[rstest]
    #[case::single_technology(10, 0, 6, 3)]
    #[case::mixed(4, 2, 6, 3)]
    #[case::under_filled_below_cap(3, 0, 6, 3)]
    #[case::under_filled_above_cap(8, 0, 20, 8)]
    #[case::nothing_over_cap(2, 2, 6, 2)]
    fn test_rebalance_keeps_capped_share(
        #[case] react: usize,
        #[case] vue: usize,
        #[case] target: usize,
        #[case] expected_react: usize,
    ) {
        let mut articles: Vec<CategorizedArticle> = (0..react).map(|i| categorized("react", 80.0 - i as f64, i)).collect();
        articles.extend((0..vue).map(|i| categorized("vue", 60.0 - i as f64, 100 + i)));

        let selected = manager().select(articles, target);

        let kept = selected.iter().filter(|s| s.primary_technology() == "react").count();
        assert_eq!(kept, expected_react);
        assert_eq!(selected.len(), expected_react + vue);
        if react > 0 {
            assert!(selected.iter().any(|s| s.quality_score() == 80.0));
        }
    }

    #[test]
    fn test_general_is_not_capped() {
        let articles: Vec<CategorizedArticle> = (0..6).map(|i| categorized("general", 50.0 - i as f64, i)).collect();
        assert_eq!(manager().select(articles, 6).len(), 6);
    }

    #[test]
    fn test_selection_bounded_by_target() {
        let articles: Vec<CategorizedArticle> = (0..10)
            .map(|i| categorized(["react", "vue", "css", "svelte", "tooling"][i % 5], 50.0 + i as f64, i))
            .collect();
        assert_eq!(manager().select(articles, 3).len(), 3);
    }

    #[test]
    fn test_validation_flags_imbalance() {
        let mut articles: Vec<CategorizedArticle> = (0..7).map(|i| categorized("react", 60.0, i)).collect();
        articles.push(categorized("vue", 60.0, 50));
        let selected: Vec<SelectedArticle> = articles
            .into_iter()
            .map(|categorized| SelectedArticle {
                categorized,
                hybrid_score: 60.0,
                selection_reason: SelectionReason::HybridScore,
            })
            .collect();
        let validation = manager().validate_diversity(&selected, 3);
        assert!(!validation.is_diverse);
        assert_eq!(validation.recommendations.len(), 2);
    }

    #[test]
    fn test_report_coverage() {
        let articles = vec![categorized("react", 60.0, 1), categorized("vue", 40.0, 2), categorized("general", 30.0, 3)];
        let report = manager().report(&articles, Domain::Frontend);
        assert_eq!(report.covered, 2);
        assert_eq!(report.table_size, 10);
        assert!((report.coverage_percentage - 20.0).abs() < 1e-9);
        assert_eq!(report.by_technology["react"].max_quality, 60.0);
    }
}
