pub mod types;
pub mod article;
pub mod config;
pub mod lexicon;
pub mod utils;
pub mod dedup;
pub mod scoring;
pub mod filter;
pub mod diversity;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod enricher;
pub mod collector;
pub mod post;
pub mod generator;
pub mod store;
pub mod traits;
pub mod pipeline;

pub use types::*;
pub use article::{
    CategorizedArticle, EnrichedArticle, FilteredArticle, RawArticle, ScoreBreakdown, ScoredArticle, SelectedArticle,
    SourceProfile,
};
pub use config::{CuratorConfig, DiversityConfig, GenerationConfig, QualityThresholds, ScoringWeights};
pub use lexicon::{Lexicon, LexiconSpec};
pub use dedup::Deduplicator;
pub use scoring::QualityScorer;
pub use filter::{ContentFilter, RejectionReason};
pub use diversity::DiversityManager;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use enricher::HttpEnricher;
pub use collector::Collector;
pub use post::{Post, PostRecord, PostStatus};
pub use generator::{GeminiClient, MockCompletion, PostGenerator};
pub use store::SqliteStore;
pub use pipeline::{CurationOutcome, CurationPipeline, Curator, RunOptions, RunReport};
