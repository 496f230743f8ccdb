use crate::article::{RawArticle, SourceProfile};
use crate::types::{CuratorError, Result};
use crate::utils::text::{clean_text, truncate_chars};
use crate::utils::url::is_http_url;
use chrono::Utc;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

pub const SUMMARY_MAX_CHARS: usize = 600;
pub const CONTENT_MAX_CHARS: usize = 2000;

/// Turns RSS/Atom documents into `RawArticle`s tagged with their source profile
pub struct FeedParser;

impl FeedParser {
    /// Parse a feed document and keep at most `max_entries` usable entries, in
    /// feed order. Entries without an http(s) link or a title are skipped, as are links
    /// repeated within the same document.
    pub fn parse(content: &str, source: &SourceProfile, max_entries: usize) -> Result<Vec<RawArticle>> {
        debug!("Parsing feed content for {} ({} bytes)", source.name, content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| CuratorError::Parse(format!("Failed to parse feed {}: {}", source.name, e)))?;

        let mut seen_urls = HashSet::new();
        let articles: Vec<RawArticle> = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::parse_entry(entry, source))
            .filter(|article| seen_urls.insert(article.url.clone()))
            .take(max_entries)
            .collect();

        info!("Parsed {} entries from {}", articles.len(), source.name);
        Ok(articles)
    }

    fn parse_entry(entry: feed_rs::model::Entry, source: &SourceProfile) -> Option<RawArticle> {
        let title = entry.title.map(|t| clean_text(&t.content)).unwrap_or_default();
        if title.is_empty() {
            debug!("Skipping untitled entry {}", entry.id);
            return None;
        }

        let url = entry.links.first()?.href.trim().to_string();
        if !is_http_url(&url) {
            debug!("Skipping entry with unusable link '{}'", url);
            return None;
        }

        let summary = entry
            .summary
            .map(|s| truncate_chars(&clean_text(&s.content), SUMMARY_MAX_CHARS))
            .unwrap_or_default();

        let content = entry
            .content
            .and_then(|c| c.body)
            .map(|body| truncate_chars(&clean_text(&body), CONTENT_MAX_CHARS))
            .filter(|body| !body.is_empty());

        let published = entry.published.or(entry.updated).map(|dt| dt.with_timezone(&Utc));

        let tags = entry.categories.into_iter().map(|c| c.term).collect();

        Some(RawArticle {
            url,
            title,
            summary,
            content,
            published,
            source: source.clone(),
            tags,
        })
    }

    /// Cheap sniff test run before handing a body to the XML parser
    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_markers = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel");

        has_feed_markers && (content.trim_start().starts_with("<?xml") || content_lower.contains('<'))
    }
}
