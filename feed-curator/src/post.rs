use crate::article::SelectedArticle;
use crate::types::{CuratorError, Domain, Result};
use crate::utils::text::extract_hashtags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fewest source articles a post may cite
pub const MIN_POST_SOURCES: usize = 2;

/// Article a post was written from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
    pub source: String,
}

impl From<&SelectedArticle> for SourceRef {
    fn from(article: &SelectedArticle) -> Self {
        Self {
            title: article.title().to_string(),
            url: article.url().to_string(),
            source: article.source().name.clone(),
        }
    }
}

/// A generated post awaiting review. Always cites at least two sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PostFields")]
pub struct Post {
    pub content: String,
    pub domain: Domain,
    pub hashtags: Vec<String>,
    sources: Vec<SourceRef>,
    pub generated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(content: impl Into<String>, domain: Domain, sources: Vec<SourceRef>, generated_at: DateTime<Utc>) -> Result<Self> {
        if sources.len() < MIN_POST_SOURCES {
            return Err(CuratorError::InsufficientSources {
                required: MIN_POST_SOURCES,
                actual: sources.len(),
            });
        }
        let content = content.into();
        if content.trim().is_empty() {
            return Err(CuratorError::Generation("post content is empty".to_string()));
        }
        let hashtags = extract_hashtags(&content);
        Ok(Self {
            content,
            domain,
            hashtags,
            sources,
            generated_at,
        })
    }

    pub fn sources(&self) -> &[SourceRef] {
        &self.sources
    }
}

/// Serialized form of a post. Hashtags are derived again from the content.
#[derive(Deserialize)]
struct PostFields {
    content: String,
    domain: Domain,
    sources: Vec<SourceRef>,
    generated_at: DateTime<Utc>,
}

impl TryFrom<PostFields> for Post {
    type Error = CuratorError;

    fn try_from(fields: PostFields) -> Result<Self> {
        Post::new(fields.content, fields.domain, fields.sources, fields.generated_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Approved,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Approved => "approved",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PostStatus::Pending),
            "approved" => Ok(PostStatus::Approved),
            "published" => Ok(PostStatus::Published),
            other => Err(CuratorError::General(format!("unknown post status: {}", other))),
        }
    }
}

/// A post as held in the review queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub content: String,
    pub domain: Domain,
    pub hashtags: Vec<String>,
    pub sources: Vec<SourceRef>,
    pub status: PostStatus,
    pub generated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(n: usize) -> SourceRef {
        SourceRef {
            title: format!("Article {}", n),
            url: format!("https://example.com/{}", n),
            source: "Example".to_string(),
        }
    }

    #[test]
    fn test_single_source_rejected() {
        let result = Post::new("Some text #rust", Domain::Backend, vec![source(1)], Utc::now());
        assert!(matches!(result, Err(CuratorError::InsufficientSources { required: 2, actual: 1 })));
    }

    #[test]
    fn test_hashtags_extracted_on_construction() {
        let post = Post::new("Two takes on async. #Rust #Tokio", Domain::Backend, vec![source(1), source(2)], Utc::now()).unwrap();
        assert_eq!(post.hashtags, vec!["#rust", "#tokio"]);
        assert_eq!(post.sources().len(), 2);
    }

    #[test]
    fn test_deserialized_posts_are_validated() {
        let single = r#"{"content": "Only one link", "domain": "backend", "hashtags": [],
            "sources": [{"title": "A", "url": "https://example.com/1", "source": "Example"}],
            "generated_at": "2026-10-15T09:00:00Z"}"#;
        assert!(serde_json::from_str::<Post>(single).is_err());

        let blank = r#"{"content": "  ", "domain": "backend", "hashtags": [],
            "sources": [{"title": "A", "url": "https://example.com/1", "source": "Example"},
                        {"title": "B", "url": "https://example.com/2", "source": "Example"}],
            "generated_at": "2026-10-15T09:00:00Z"}"#;
        assert!(serde_json::from_str::<Post>(blank).is_err());

        let stored = r##"{"content": "Two reads #Rust", "domain": "backend", "hashtags": ["#stale"],
            "sources": [{"title": "A", "url": "https://example.com/1", "source": "Example"},
                        {"title": "B", "url": "https://example.com/2", "source": "Example"}],
            "generated_at": "2026-10-15T09:00:00Z"}"##;
        let post: Post = serde_json::from_str(stored).unwrap();
        assert_eq!(post.hashtags, vec!["#rust"]);
        assert_eq!(post.sources().len(), 2);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [PostStatus::Pending, PostStatus::Approved, PostStatus::Published] {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
        assert!("archived".parse::<PostStatus>().is_err());
    }
}
