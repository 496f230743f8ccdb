use crate::article::{EnrichedArticle, RawArticle};
use crate::config::CuratorConfig;
use crate::traits::{ArticleSource, Enricher};
use crate::types::{CuratorError, ExtractionQuality, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Articles gathered from a set of sources, plus the sources that yielded nothing
#[derive(Debug, Default)]
pub struct Collection {
    pub articles: Vec<RawArticle>,
    pub failed_sources: Vec<String>,
}

/// Bounded-concurrency fetch and enrichment pools
#[derive(Debug, Clone)]
pub struct Collector {
    fetch_concurrency: usize,
    enrich_concurrency: usize,
    source_timeout: Duration,
    enrich_timeout: Duration,
    max_entries_per_source: usize,
    max_age_days: i64,
}

impl Collector {
    pub fn new(config: &CuratorConfig) -> Self {
        Self {
            fetch_concurrency: config.fetch_concurrency.max(1),
            enrich_concurrency: config.enrich_concurrency.max(1),
            source_timeout: Duration::from_secs(config.per_source_timeout_seconds),
            enrich_timeout: Duration::from_secs(config.per_source_timeout_seconds),
            max_entries_per_source: config.max_entries_per_source,
            max_age_days: config.quality.max_age_days,
        }
    }

    /// Fetches every source with at most `fetch_concurrency` in flight. Results
    /// keep source order. A source that fails or exceeds its timeout
    /// contributes zero articles.
    pub async fn collect(&self, sources: &[Arc<dyn ArticleSource>]) -> Collection {
        let start = Instant::now();
        let max_entries = self.max_entries_per_source;
        let limit = self.source_timeout;

        let results: Vec<(String, Result<Vec<RawArticle>>)> = stream::iter(sources.iter().cloned().map(|source| async move {
            let name = source.name().to_string();
            let result = match tokio::time::timeout(limit, source.fetch_articles(max_entries)).await {
                Ok(result) => result,
                Err(_) => Err(CuratorError::Timeout {
                    what: format!("source {}", name),
                    seconds: limit.as_secs(),
                }),
            };
            (name, result)
        }))
        .buffered(self.fetch_concurrency)
        .collect()
        .await;

        let mut collection = Collection::default();
        for (name, result) in results {
            match result {
                Ok(articles) => {
                    debug!("{} yielded {} articles", name, articles.len());
                    collection.articles.extend(articles);
                }
                Err(e) => {
                    warn!("Source {} yielded no articles: {}", name, e);
                    collection.failed_sources.push(name);
                }
            }
        }

        info!(
            "Collected {} articles from {} sources ({} failed) in {} ms",
            collection.articles.len(),
            sources.len(),
            collection.failed_sources.len(),
            start.elapsed().as_millis()
        );
        collection
    }

    /// Fetches full bodies with at most `enrich_concurrency` in flight.
    /// Articles older than `max_age_days` are not fetched and keep their
    /// feed text marked `TooOld`. Output order follows input order.
    pub async fn enrich(&self, enricher: Arc<dyn Enricher>, articles: Vec<RawArticle>, now: DateTime<Utc>) -> Vec<EnrichedArticle> {
        let cutoff = now - ChronoDuration::days(self.max_age_days);
        let limit = self.enrich_timeout;

        let enriched: Vec<EnrichedArticle> = stream::iter(articles.into_iter().map(|raw| {
            let enricher = enricher.clone();
            async move {
                if raw.published.map(|published| published < cutoff).unwrap_or(false) {
                    debug!("Skipping extraction for old article {}", raw.url);
                    return EnrichedArticle::with_fallback(raw, ExtractionQuality::TooOld);
                }

                let extraction = match tokio::time::timeout(limit, enricher.fetch_body(&raw.url)).await {
                    Ok(result) => result,
                    Err(_) => Err(CuratorError::Timeout {
                        what: format!("extraction of {}", raw.url),
                        seconds: limit.as_secs(),
                    }),
                };
                if let Err(e) = &extraction {
                    debug!("Extraction failed for {}: {}", raw.url, e);
                }
                EnrichedArticle::from_extraction(raw, extraction)
            }
        }))
        .buffered(self.enrich_concurrency)
        .collect()
        .await;

        let full = enriched.iter().filter(|a| a.extraction_quality == ExtractionQuality::Full).count();
        info!("Enriched {} articles ({} with full text)", enriched.len(), full);
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::SourceProfile;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        profile: SourceProfile,
        articles: Vec<RawArticle>,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl ArticleSource for StaticSource {
        fn name(&self) -> &str {
            &self.profile.name
        }

        fn profile(&self) -> &SourceProfile {
            &self.profile
        }

        async fn fetch_articles(&self, max_entries: usize) -> Result<Vec<RawArticle>> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(CuratorError::General("connection refused".into()));
            }
            Ok(self.articles.iter().take(max_entries).cloned().collect())
        }
    }

    fn source(name: &str, count: usize, delay_ms: u64, fail: bool) -> Arc<dyn ArticleSource> {
        let profile = SourceProfile::new(name, 8.0);
        let articles = (0..count)
            .map(|i| RawArticle::new(format!("https://{}.dev/{}", name, i), format!("{} post {}", name, i), profile.clone()))
            .collect();
        Arc::new(StaticSource {
            profile,
            articles,
            delay: Duration::from_millis(delay_ms),
            fail,
        })
    }

    fn collector(timeout_seconds: u64) -> Collector {
        Collector::new(&CuratorConfig {
            per_source_timeout_seconds: timeout_seconds,
            max_entries_per_source: 3,
            ..CuratorConfig::default()
        })
    }

    #[tokio::test]
    async fn test_failed_source_yields_nothing() {
        let sources = vec![source("alpha", 5, 0, false), source("broken", 5, 0, true), source("beta", 2, 0, false)];
        let collection = collector(5).collect(&sources).await;
        assert_eq!(collection.articles.len(), 5);
        assert_eq!(collection.failed_sources, vec!["broken".to_string()]);
        assert!(collection.articles[0].url.starts_with("https://alpha.dev"));
        assert!(collection.articles[4].url.starts_with("https://beta.dev"));
    }

    #[tokio::test]
    async fn test_slow_source_is_abandoned() {
        let sources = vec![source("slow", 3, 3_000, false), source("fast", 1, 0, false)];
        let collection = collector(1).collect(&sources).await;
        assert_eq!(collection.articles.len(), 1);
        assert_eq!(collection.failed_sources, vec!["slow".to_string()]);
    }

    struct CountingEnricher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Enricher for CountingEnricher {
        async fn fetch_body(&self, url: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("/0") {
                return Err(CuratorError::General("404".into()));
            }
            Ok(Some("body text ".repeat(40)))
        }
    }

    #[tokio::test]
    async fn test_old_articles_skip_extraction() {
        let now = Utc::now();
        let profile = SourceProfile::new("feed", 8.0);
        let articles = vec![
            RawArticle::new("https://feed.dev/0", "first", profile.clone()).with_summary("fallback summary"),
            RawArticle::new("https://feed.dev/1", "second", profile.clone()).with_published(now - ChronoDuration::days(2)),
            RawArticle::new("https://feed.dev/2", "third", profile).with_published(now - ChronoDuration::days(30)),
        ];
        let enricher = Arc::new(CountingEnricher { calls: AtomicUsize::new(0) });

        let enriched = collector(5).enrich(enricher.clone(), articles, now).await;

        assert_eq!(enricher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(enriched[0].extraction_quality, ExtractionQuality::Error);
        assert_eq!(enriched[0].text, "fallback summary");
        assert_eq!(enriched[1].extraction_quality, ExtractionQuality::Full);
        assert_eq!(enriched[2].extraction_quality, ExtractionQuality::TooOld);
    }
}
