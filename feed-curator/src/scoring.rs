use crate::article::{EnrichedArticle, ScoreBreakdown, ScoredArticle, SourceProfile};
use crate::config::ScoringWeights;
use crate::lexicon::Lexicon;
use crate::types::{Domain, ScoreComponent};
use crate::utils::{text, time};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Score used when an article has no publish date
pub const UNKNOWN_FRESHNESS: f64 = 0.6;

/// Neutral relevance for sources that declare no focus
const NO_FOCUS_RELEVANCE: f64 = 0.5;

/// Word-count band that earns full length credit
const IDEAL_WORDS: (usize, usize) = (500, 3000);

const FRESHNESS_STEPS: [(f64, f64); 6] = [
    (6.0, 1.0),
    (24.0, 0.95),
    (72.0, 0.85),
    (168.0, 0.7),
    (336.0, 0.5),
    (720.0, 0.3),
];
const STALE_FRESHNESS: f64 = 0.1;

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Multi-factor quality scorer. Each component lands in [0, 1] and the total
/// is `Σ component × weight × 100`.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    lexicon: Arc<Lexicon>,
    weights: ScoringWeights,
}

impl QualityScorer {
    pub fn new(lexicon: Arc<Lexicon>, weights: ScoringWeights) -> Self {
        Self { lexicon, weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(&self, article: EnrichedArticle, domain: Domain) -> ScoredArticle {
        self.score_at(article, domain, Utc::now())
    }

    /// Scores against an explicit clock so freshness is reproducible
    pub fn score_at(&self, article: EnrichedArticle, domain: Domain, now: DateTime<Utc>) -> ScoredArticle {
        let (quality_score, breakdown) = self.evaluate(&article, now);
        debug!("Scored '{}' at {:.1}", article.title(), quality_score);
        ScoredArticle {
            article,
            domain,
            quality_score,
            breakdown,
        }
    }

    pub fn evaluate(&self, article: &EnrichedArticle, now: DateTime<Utc>) -> (f64, ScoreBreakdown) {
        let source = article.source();
        let mut breakdown = ScoreBreakdown::default();
        breakdown.insert(ScoreComponent::SourceAuthority, self.source_authority(source));
        breakdown.insert(ScoreComponent::ContentDepth, self.content_depth(article.title(), &article.text));
        breakdown.insert(ScoreComponent::NoveltyFactor, self.novelty(article.title(), &article.text));
        breakdown.insert(ScoreComponent::TechnicalValue, self.technical_value(article.title(), &article.text));
        breakdown.insert(ScoreComponent::Freshness, self.freshness(article.published(), now));
        breakdown.insert(ScoreComponent::Relevance, self.relevance(article.title(), &article.text, source));

        let total = self.total(&breakdown);
        (total, breakdown)
    }

    pub fn total(&self, breakdown: &ScoreBreakdown) -> f64 {
        breakdown
            .iter()
            .map(|(component, value)| value * self.weights.weight(component) * 100.0)
            .sum::<f64>()
            .max(0.0)
    }

    pub fn source_authority(&self, source: &SourceProfile) -> f64 {
        clamp_unit(source.weight / 10.0 * source.kind.authority_multiplier())
    }

    pub fn content_depth(&self, title: &str, body: &str) -> f64 {
        let words = text::word_count(body);
        let (low, high) = IDEAL_WORDS;
        let length_score = if (low..=high).contains(&words) {
            1.0
        } else if words < low {
            (words as f64 / low as f64).max(0.3)
        } else {
            (1.0 - (words - high) as f64 / 10_000.0).max(0.7)
        };

        let code_blocks: usize = self
            .lexicon
            .code_patterns
            .iter()
            .map(|pattern| pattern.find_iter(body).count())
            .sum();
        let code_score = (code_blocks as f64 * 0.15).min(0.6);

        let structure_score: f64 = self
            .lexicon
            .structure_patterns
            .iter()
            .filter(|pattern| pattern.regex.is_match(body))
            .map(|pattern| pattern.weight)
            .sum();

        let title_depth = self
            .lexicon
            .depth_title_patterns
            .iter()
            .filter(|pattern| pattern.is_match(title))
            .count() as f64
            * 0.1;

        clamp_unit((length_score + code_score + structure_score + title_depth) / 2.5)
    }

    /// Category hits weighted by category, title hits worth more than body hits
    pub fn novelty(&self, title: &str, body: &str) -> f64 {
        let mut score = 0.0;

        for category in &self.lexicon.novelty {
            let mut category_score: f64 = 0.0;
            for pattern in &category.patterns {
                if pattern.is_match(title) {
                    category_score += 0.3;
                } else if pattern.is_match(body) {
                    category_score += 0.2;
                }
            }
            score += category_score.min(1.0) * category.weight;
        }

        if self.lexicon.version_patterns.iter().any(|p| p.is_match(title)) {
            score += 0.1;
        }
        if self.lexicon.date_patterns.iter().any(|p| p.is_match(title)) {
            score += 0.05;
        }

        clamp_unit(score)
    }

    pub fn technical_value(&self, title: &str, body: &str) -> f64 {
        let full_text = format!("{} {}", title, body);

        let indicator_score: f64 = self
            .lexicon
            .technical_indicators
            .iter()
            .filter(|indicator| indicator.regex.is_match(&full_text))
            .map(|indicator| indicator.weight)
            .sum();

        let term_bonus = self
            .lexicon
            .specialized_terms
            .iter()
            .filter(|term| term.is_match(&full_text))
            .count() as f64
            * 0.02;

        clamp_unit(indicator_score + term_bonus.min(0.2))
    }

    /// Step function of age; unknown dates get a fixed mid value
    pub fn freshness(&self, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(published) = published else {
            return UNKNOWN_FRESHNESS;
        };
        let age = time::age_hours(published, now);
        FRESHNESS_STEPS
            .iter()
            .find(|(max_hours, _)| age < *max_hours)
            .map(|(_, score)| *score)
            .unwrap_or(STALE_FRESHNESS)
    }

    pub fn relevance(&self, title: &str, body: &str, source: &SourceProfile) -> f64 {
        let focus = match source.focus.as_deref().map(str::trim) {
            Some(focus) if !focus.is_empty() => focus,
            _ => return NO_FOCUS_RELEVANCE,
        };

        let keywords = self.lexicon.focus_keywords(focus);
        if keywords.is_empty() {
            return 0.0;
        }

        let title = title.to_lowercase();
        let body = body.to_lowercase();
        let title_matches = keywords.iter().filter(|k| title.contains(k.as_str())).count();
        let body_matches = keywords.iter().filter(|k| body.contains(k.as_str())).count();

        let matches = (title_matches * 2 + body_matches) as f64;
        clamp_unit(matches / (keywords.len() * 3) as f64)
    }

    /// Human-readable breakdown for debugging a score
    pub fn explain(&self, scored: &ScoredArticle) -> String {
        let title: String = scored.title().chars().take(50).collect();
        let mut explanation = String::new();
        let _ = writeln!(explanation, "Quality score breakdown for: {}", title);
        let _ = writeln!(explanation, "Total: {:.1}/100", scored.quality_score);
        for (component, value) in scored.breakdown.iter() {
            let weight = self.weights.weight(component);
            let _ = writeln!(
                explanation,
                "{}: {:.2} (weight {:.0}%) = {:.1} points",
                component.as_str(),
                value,
                weight * 100.0,
                value * weight * 100.0
            );
        }
        explanation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::RawArticle;
    use crate::types::{ExtractionQuality, SourceKind};
    use chrono::Duration;

    fn scorer() -> QualityScorer {
        QualityScorer::new(Arc::new(Lexicon::builtin().unwrap()), ScoringWeights::default())
    }

    fn enriched(title: &str, body: &str, source: SourceProfile) -> EnrichedArticle {
        EnrichedArticle {
            raw: RawArticle::new("https://example.com/post", title, source).with_summary(body),
            text: body.to_string(),
            extraction_quality: ExtractionQuality::SummaryOnly,
        }
    }

    #[test]
    fn test_unknown_date_gets_mid_freshness() {
        let scorer = scorer();
        assert_eq!(scorer.freshness(None, Utc::now()), 0.6);
    }

    #[test]
    fn test_freshness_steps() {
        let scorer = scorer();
        let now = Utc::now();
        assert_eq!(scorer.freshness(Some(now - Duration::hours(2)), now), 1.0);
        assert_eq!(scorer.freshness(Some(now - Duration::hours(30)), now), 0.85);
        assert_eq!(scorer.freshness(Some(now - Duration::days(10)), now), 0.5);
        assert_eq!(scorer.freshness(Some(now - Duration::days(90)), now), 0.1);
        assert_eq!(scorer.freshness(Some(now + Duration::hours(3)), now), 1.0);
    }

    #[test]
    fn test_authority_capped_at_one() {
        let scorer = scorer();
        let official = SourceProfile::new("React Blog", 10.0).with_kind(SourceKind::Official);
        assert_eq!(scorer.source_authority(&official), 1.0);
        let blog = SourceProfile::new("Someone", 6.0).with_kind(SourceKind::Blog);
        assert!((scorer.source_authority(&blog) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_novelty_prefers_title_hits() {
        let scorer = scorer();
        let in_title = scorer.novelty("Deno 2.0 released", "notes");
        let in_body = scorer.novelty("Deno notes", "the runtime was released today");
        assert!(in_title > in_body);
        assert!(in_body > 0.0);
    }

    #[test]
    fn test_relevance_without_focus_is_neutral() {
        let scorer = scorer();
        let source = SourceProfile::new("Anyone", 5.0);
        assert_eq!(scorer.relevance("title", "body", &source), 0.5);
    }

    #[test]
    fn test_relevance_counts_title_double() {
        let scorer = scorer();
        let source = SourceProfile::new("Guides", 5.0).with_focus("tutorials");
        // "guide" in title (2) and body (1), five keywords → 3 / 15
        let relevance = scorer.relevance("A guide to axum", "this guide walks through routing", &source);
        assert!((relevance - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_components_bounded_and_total_non_negative() {
        let scorer = scorer();
        let body = "```rust\nfn main() {}\n```\n".repeat(20)
            + &"# Header\n- item\n1. step\n> quote\n".repeat(10)
            + &"algorithm concurrency async closure polymorphism benchmark security ".repeat(400);
        let article = enriched(
            "Complete advanced guide: how to implement architecture patterns, deep dive v2.3.1 released 2024",
            &body,
            SourceProfile::new("Big", 12.0).with_kind(SourceKind::Official).with_focus("releases"),
        );
        let (total, breakdown) = scorer.evaluate(&article, Utc::now());
        for component in ScoreComponent::ALL {
            let value = breakdown.get(component);
            assert!((0.0..=1.0).contains(&value), "{} out of range: {}", component.as_str(), value);
        }
        assert!(total >= 0.0 && total <= 100.0 + 1e-9);
    }

    #[test]
    fn test_empty_article_scores_non_negative() {
        let scorer = scorer();
        let article = enriched("", "", SourceProfile::new("Nobody", 0.0));
        let scored = scorer.score(article, Domain::General);
        assert!(scored.quality_score >= 0.0);
        assert_eq!(scored.breakdown.get(ScoreComponent::Freshness), 0.6);
    }

    #[test]
    fn test_explanation_lists_every_component() {
        let scorer = scorer();
        let scored = scorer.score(enriched("Rust 1.80 released", "LazyLock is stable", SourceProfile::new("Rust Blog", 10.0)), Domain::Backend);
        let explanation = scorer.explain(&scored);
        for component in ScoreComponent::ALL {
            assert!(explanation.contains(component.as_str()));
        }
    }
}
