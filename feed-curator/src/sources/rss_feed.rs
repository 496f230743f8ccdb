use crate::article::{RawArticle, SourceProfile};
use crate::sources::catalog::SourceSpec;
use crate::traits::ArticleSource;
use crate::types::{CuratorError, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{info, warn};

/// RSS or Atom feed listed in the source catalog
pub struct RssFeedSource {
    pub url: String,
    profile: SourceProfile,
    fetcher: Fetcher,
}

impl RssFeedSource {
    pub fn new(url: impl Into<String>, profile: SourceProfile, fetcher: Fetcher) -> Self {
        Self {
            url: url.into(),
            profile,
            fetcher,
        }
    }

    pub fn from_spec(spec: &SourceSpec, fetcher: Fetcher) -> Self {
        Self::new(spec.url.clone(), spec.profile(), fetcher)
    }
}

#[async_trait]
impl ArticleSource for RssFeedSource {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    async fn fetch_articles(&self, max_entries: usize) -> Result<Vec<RawArticle>> {
        info!("Pulling RSS feed: {}", self.url);

        let document = self.fetcher.fetch(&self.url).await?;
        if !FeedParser::is_valid_feed_content(&document.body) {
            warn!("{} did not return a feed document", self.url);
            return Err(CuratorError::Parse(format!("not a feed: {}", self.url)));
        }

        let articles = FeedParser::parse(&document.body, &self.profile, max_entries)?;
        info!("Pulled {} items from {} in {} ms", articles.len(), self.profile.name, document.response_time_ms);
        Ok(articles)
    }
}
