use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Editorial domain a run is curated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Frontend,
    Backend,
    Ai,
    General,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Frontend, Domain::Backend, Domain::Ai, Domain::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Frontend => "frontend",
            Domain::Backend => "backend",
            Domain::Ai => "ai",
            Domain::General => "general",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "frontend" => Ok(Domain::Frontend),
            "backend" => Ok(Domain::Backend),
            "ai" => Ok(Domain::Ai),
            "general" => Ok(Domain::General),
            other => Err(CuratorError::Config(format!("unknown domain: {}", other))),
        }
    }
}

/// How much of an article body the enricher managed to retrieve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionQuality {
    Full,
    SummaryOnly,
    Error,
    TooOld,
}

impl ExtractionQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionQuality::Full => "full",
            ExtractionQuality::SummaryOnly => "summary_only",
            ExtractionQuality::Error => "error",
            ExtractionQuality::TooOld => "too_old",
        }
    }
}

/// Why the diversity manager put an article into the final batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionReason {
    DiversityGuarantee,
    HybridScore,
}

/// The six weighted components of the quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    SourceAuthority,
    ContentDepth,
    NoveltyFactor,
    TechnicalValue,
    Freshness,
    Relevance,
}

impl ScoreComponent {
    pub const ALL: [ScoreComponent; 6] = [
        ScoreComponent::SourceAuthority,
        ScoreComponent::ContentDepth,
        ScoreComponent::NoveltyFactor,
        ScoreComponent::TechnicalValue,
        ScoreComponent::Freshness,
        ScoreComponent::Relevance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreComponent::SourceAuthority => "source_authority",
            ScoreComponent::ContentDepth => "content_depth",
            ScoreComponent::NoveltyFactor => "novelty_factor",
            ScoreComponent::TechnicalValue => "technical_value",
            ScoreComponent::Freshness => "freshness",
            ScoreComponent::Relevance => "relevance",
        }
    }
}

/// Editorial kind of a source; official and research outlets earn an authority bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Official,
    Research,
    DeepDive,
    Expert,
    Mvp,
    CoreTeam,
    Foundation,
    Blog,
    Community,
    #[default]
    #[serde(other)]
    Other,
}

impl SourceKind {
    pub fn authority_multiplier(&self) -> f64 {
        match self {
            SourceKind::Official => 1.2,
            SourceKind::Research | SourceKind::CoreTeam => 1.15,
            SourceKind::DeepDive | SourceKind::Expert | SourceKind::Foundation => 1.1,
            SourceKind::Mvp => 1.05,
            SourceKind::Blog | SourceKind::Community | SourceKind::Other => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_millis: u64,
    pub max_body_size_mb: usize,
    pub max_redirects: usize,
    pub min_host_interval_millis: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; feed-curator/0.1)".to_string(),
            timeout_seconds: 8,
            max_retries: 2,
            retry_delay_millis: 500,
            max_body_size_mb: 10,
            max_redirects: 5,
            min_host_interval_millis: 250,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation needs at least {required} source articles, got {actual}")]
    InsufficientSources { required: usize, actual: usize },

    #[error("Post not found: {id}")]
    PostNotFound { id: i64 },

    #[error("Post {id} cannot {action} while {status}")]
    InvalidTransition {
        id: i64,
        action: &'static str,
        status: &'static str,
    },

    #[error("Timed out after {seconds} seconds: {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("Body exceeds size limit: {size_mb}MB")]
    BodyTooLarge { size_mb: usize },

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
