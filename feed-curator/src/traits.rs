use crate::article::{RawArticle, SourceProfile};
use crate::post::{Post, PostRecord};
use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything that can produce candidate articles for a run (RSS feeds, APIs, fixtures)
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Human-readable name for this source
    fn name(&self) -> &str;

    /// Weight, kind and focus the scorer applies to every article from this source
    fn profile(&self) -> &SourceProfile;

    /// Fetch up to `max_entries` recent items
    async fn fetch_articles(&self, max_entries: usize) -> Result<Vec<RawArticle>>;
}

/// Retrieves the readable body of an article page
#[async_trait]
pub trait Enricher: Send + Sync {
    /// `Ok(None)` when the page had no extractable text
    async fn fetch_body(&self, url: &str) -> Result<Option<String>>;
}

/// Opaque text-completion service: prompt in, text out, may fail
#[async_trait]
pub trait TextCompletion: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Review queue for generated posts
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn save_post(&self, post: &Post) -> Result<i64>;

    async fn get_post(&self, id: i64) -> Result<PostRecord>;

    async fn list_pending(&self) -> Result<Vec<PostRecord>>;

    async fn list_approved(&self) -> Result<Vec<PostRecord>>;

    async fn approve(&self, id: i64) -> Result<()>;

    /// Marks an approved post as published and stamps `published_at`
    async fn mark_published(&self, id: i64) -> Result<()>;

    async fn update_content(&self, id: i64, content: &str) -> Result<()>;

    async fn delete_post(&self, id: i64) -> Result<()>;
}

/// Short-lived cache of fetched articles, keyed by URL
#[async_trait]
pub trait ArticleCache: Send + Sync {
    /// Unexpired entries, optionally limited to sources whose name contains `source_filter`
    async fn get_cached_articles(&self, source_filter: Option<&str>) -> Result<Vec<RawArticle>>;

    /// Insert or refresh entries; writing the same URL twice is harmless
    async fn save_articles_to_cache(&self, articles: &[RawArticle], ttl_hours: i64) -> Result<usize>;

    async fn cache_stats(&self) -> Result<CacheStats>;

    /// Removes expired entries and returns how many were dropped
    async fn purge_expired(&self) -> Result<u64>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total: i64,
    pub expired: i64,
    pub active: i64,
    pub by_source: BTreeMap<String, i64>,
}
