//! Orchestration of a curation run.
//!
//! `CurationPipeline` is the synchronous core: dedup, screening, scoring, the
//! score floor and diversity selection over one batch. `Curator` wraps it with
//! the injected collaborators (sources, enricher, completion service, stores)
//! and turns every outcome into a `RunReport`.

use crate::article::{EnrichedArticle, RawArticle, SelectedArticle};
use crate::collector::Collector;
use crate::config::CuratorConfig;
use crate::dedup::Deduplicator;
use crate::diversity::{DiversityManager, DiversityReport, DiversityValidation};
use crate::filter::{ContentFilter, FilterStats, RejectionCounts};
use crate::generator::PostGenerator;
use crate::lexicon::Lexicon;
use crate::post::MIN_POST_SOURCES;
use crate::scoring::QualityScorer;
use crate::traits::{ArticleCache, ArticleSource, Enricher, PostStore, TextCompletion};
use crate::types::{CuratorError, Domain, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Article counts after each stage of a curation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    pub input: usize,
    pub after_dedup: usize,
    pub after_screen: usize,
    pub after_score_floor: usize,
    pub selected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationOutcome {
    pub domain: Domain,
    pub selected: Vec<SelectedArticle>,
    pub stats: StageStats,
    pub rejections: RejectionCounts,
    pub filter_stats: FilterStats,
    /// Categories of everything that survived the filter
    pub pool_report: DiversityReport,
    pub validation: DiversityValidation,
}

pub struct CurationPipeline {
    deduplicator: Deduplicator,
    scorer: QualityScorer,
    filter: ContentFilter,
    diversity: DiversityManager,
}

impl CurationPipeline {
    pub fn new(lexicon: Arc<Lexicon>, config: &CuratorConfig) -> Self {
        Self {
            deduplicator: Deduplicator::new(),
            scorer: QualityScorer::new(lexicon.clone(), config.quality.scoring_weights.clone()),
            filter: ContentFilter::new(lexicon.clone(), config.quality.clone()),
            diversity: DiversityManager::new(lexicon, config.diversity.clone()),
        }
    }

    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    pub fn diversity(&self) -> &DiversityManager {
        &self.diversity
    }

    pub fn curate(&self, domain: Domain, articles: Vec<EnrichedArticle>, target_count: usize) -> CurationOutcome {
        self.curate_at(domain, articles, target_count, Utc::now())
    }

    /// Runs the core stages in order. Screening happens before scoring so
    /// rejected articles are never scored.
    pub fn curate_at(
        &self,
        domain: Domain,
        articles: Vec<EnrichedArticle>,
        target_count: usize,
        now: DateTime<Utc>,
    ) -> CurationOutcome {
        let mut stats = StageStats {
            input: articles.len(),
            ..StageStats::default()
        };

        let unique = self.deduplicator.dedupe(articles);
        stats.after_dedup = unique.len();

        let screened = self.filter.screen(unique, now);
        stats.after_screen = screened.kept.len();
        let mut rejections = screened.rejections;

        let scored = screened
            .kept
            .into_iter()
            .map(|article| self.scorer.score_at(article, domain, now))
            .collect();

        let floored = self.filter.apply_score_floor(scored);
        stats.after_score_floor = floored.kept.len();
        rejections.merge(&floored.rejections);

        let filter_stats = FilterStats::new(stats.after_dedup, stats.after_score_floor, &rejections);

        let categorized = self.diversity.categorize(floored.kept, domain);
        let pool_report = self.diversity.report(&categorized, domain);
        let selected = self.diversity.select(categorized, target_count);
        stats.selected = selected.len();

        let validation = self
            .diversity
            .validate_diversity(&selected, self.diversity.config().min_tech_categories);
        for recommendation in &validation.recommendations {
            info!("Diversity: {}", recommendation);
        }

        info!(
            "Curated {}: {} in, {} unique, {} screened, {} above floor, {} selected",
            domain, stats.input, stats.after_dedup, stats.after_screen, stats.after_score_floor, stats.selected
        );

        CurationOutcome {
            domain,
            selected,
            stats,
            rejections,
            filter_stats,
            pool_report,
            validation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target_count: usize,
    pub use_cache: bool,
    /// Stop after curation: no generation, nothing saved
    pub dry_run: bool,
}

/// Result of one run at the orchestration boundary. Failures are reported
/// here, never raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub domain: Domain,
    pub success: bool,
    pub message: Option<String>,
    pub post_id: Option<i64>,
    pub articles_collected: usize,
    pub from_cache: usize,
    pub failed_sources: Vec<String>,
    pub stats: Option<StageStats>,
    pub selected: Vec<SelectedSummary>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedSummary {
    pub title: String,
    pub url: String,
    pub source: String,
    pub technology: String,
    pub quality_score: f64,
    pub hybrid_score: f64,
}

impl From<&SelectedArticle> for SelectedSummary {
    fn from(article: &SelectedArticle) -> Self {
        Self {
            title: article.title().to_string(),
            url: article.url().to_string(),
            source: article.source().name.clone(),
            technology: article.primary_technology().to_string(),
            quality_score: article.quality_score(),
            hybrid_score: article.hybrid_score,
        }
    }
}

/// Collaborators a run needs; owned by the caller
pub struct Curator {
    config: CuratorConfig,
    pipeline: CurationPipeline,
    collector: Collector,
    enricher: Arc<dyn Enricher>,
    generator: PostGenerator,
    posts: Arc<dyn PostStore>,
    cache: Arc<dyn ArticleCache>,
}

impl Curator {
    pub fn new(
        config: CuratorConfig,
        lexicon: Arc<Lexicon>,
        enricher: Arc<dyn Enricher>,
        completion: Arc<dyn TextCompletion>,
        posts: Arc<dyn PostStore>,
        cache: Arc<dyn ArticleCache>,
    ) -> Self {
        Self {
            pipeline: CurationPipeline::new(lexicon, &config),
            collector: Collector::new(&config),
            generator: PostGenerator::new(completion),
            config,
            enricher,
            posts,
            cache,
        }
    }

    pub fn pipeline(&self) -> &CurationPipeline {
        &self.pipeline
    }

    pub async fn run(&self, domain: Domain, sources: &[Arc<dyn ArticleSource>], options: &RunOptions) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport {
            run_id: Uuid::new_v4(),
            domain,
            success: false,
            message: None,
            post_id: None,
            articles_collected: 0,
            from_cache: 0,
            failed_sources: Vec::new(),
            stats: None,
            selected: Vec::new(),
            duration_ms: 0,
        };
        info!("Run {} started for {} with {} sources", report.run_id, domain, sources.len());

        match self.execute(domain, sources, options, &mut report).await {
            Ok(()) => report.success = true,
            Err(e) => {
                error!("Run {} for {} failed: {}", report.run_id, domain, e);
                report.message = Some(e.to_string());
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!("Run {} finished in {} ms (success: {})", report.run_id, report.duration_ms, report.success);
        report
    }

    async fn execute(
        &self,
        domain: Domain,
        sources: &[Arc<dyn ArticleSource>],
        options: &RunOptions,
        report: &mut RunReport,
    ) -> Result<()> {
        let (mut raw, to_fetch) = if options.use_cache {
            self.cached_articles(sources).await
        } else {
            (Vec::new(), sources.to_vec())
        };
        report.from_cache = raw.len();

        let collection = self.collector.collect(&to_fetch).await;
        report.failed_sources = collection.failed_sources;
        if options.use_cache && !collection.articles.is_empty() {
            if let Err(e) = self
                .cache
                .save_articles_to_cache(&collection.articles, self.config.cache_ttl_hours)
                .await
            {
                warn!("Cache write failed, continuing without it: {}", e);
            }
        }
        raw.extend(collection.articles);
        report.articles_collected = raw.len();

        let now = Utc::now();
        let enriched = self.collector.enrich(self.enricher.clone(), raw, now).await;
        let outcome = self.pipeline.curate_at(domain, enriched, options.target_count, now);
        report.stats = Some(outcome.stats.clone());
        report.selected = outcome.selected.iter().map(SelectedSummary::from).collect();

        if outcome.selected.len() < MIN_POST_SOURCES {
            return Err(CuratorError::InsufficientSources {
                required: MIN_POST_SOURCES,
                actual: outcome.selected.len(),
            });
        }

        if options.dry_run {
            report.message = Some(format!("dry run: {} articles selected, nothing generated", outcome.selected.len()));
            return Ok(());
        }

        let post = self.generator.generate_at(domain, &outcome.selected, now).await?;
        let id = self.posts.save_post(&post).await?;
        report.post_id = Some(id);
        report.message = Some(format!("post {} queued for review", id));
        Ok(())
    }

    /// Unexpired cached articles of the given sources, plus the sources that
    /// had nothing cached. Cache failures count as an empty cache.
    async fn cached_articles(&self, sources: &[Arc<dyn ArticleSource>]) -> (Vec<RawArticle>, Vec<Arc<dyn ArticleSource>>) {
        let cached = match self.cache.get_cached_articles(None).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Cache read failed, fetching everything: {}", e);
                Vec::new()
            }
        };

        let wanted: HashSet<&str> = sources.iter().map(|s| s.name()).collect();
        let hits: Vec<RawArticle> = cached
            .into_iter()
            .filter(|article| wanted.contains(article.source.name.as_str()))
            .collect();
        let cached_sources: HashSet<&str> = hits.iter().map(|a| a.source.name.as_str()).collect();
        let to_fetch: Vec<Arc<dyn ArticleSource>> = sources
            .iter()
            .filter(|source| !cached_sources.contains(source.name()))
            .cloned()
            .collect();

        info!("Cache supplied {} articles; {} sources to fetch", hits.len(), to_fetch.len());
        (hits, to_fetch)
    }
}
