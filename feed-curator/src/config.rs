use crate::types::{CuratorError, FetchConfig, Result, ScoreComponent};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Ten years. Larger spans overflow chrono durations.
const MAX_AGE_DAYS_LIMIT: i64 = 3650;
const CACHE_TTL_HOURS_LIMIT: i64 = 24 * 365;

/// Relative weight of each score component; the six weights sum to 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub source_authority: f64,
    pub content_depth: f64,
    pub novelty_factor: f64,
    pub technical_value: f64,
    pub freshness: f64,
    pub relevance: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            source_authority: 0.20,
            content_depth: 0.25,
            novelty_factor: 0.25,
            technical_value: 0.15,
            freshness: 0.10,
            relevance: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn weight(&self, component: ScoreComponent) -> f64 {
        match component {
            ScoreComponent::SourceAuthority => self.source_authority,
            ScoreComponent::ContentDepth => self.content_depth,
            ScoreComponent::NoveltyFactor => self.novelty_factor,
            ScoreComponent::TechnicalValue => self.technical_value,
            ScoreComponent::Freshness => self.freshness,
            ScoreComponent::Relevance => self.relevance,
        }
    }

    pub fn total(&self) -> f64 {
        ScoreComponent::ALL.iter().map(|c| self.weight(*c)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_word_count: usize,
    pub max_word_count: usize,
    pub min_quality_score: f64,
    pub max_age_days: i64,
    pub scoring_weights: ScoringWeights,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_word_count: 50,
            max_word_count: 15_000,
            min_quality_score: 15.0,
            max_age_days: 14,
            scoring_weights: ScoringWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    pub underrepresented_bonus: f64,
    pub overrepresented_penalty: f64,
    pub rare_tech_bonus: f64,
    /// Quality a technology's best article must exceed to earn a reserved slot.
    /// Independent of `QualityThresholds::min_quality_score`.
    pub quality_threshold_guaranteed: f64,
    pub max_tech_dominance: f64,
    pub min_tech_categories: usize,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            underrepresented_bonus: 1.3,
            overrepresented_penalty: 0.7,
            rare_tech_bonus: 1.2,
            quality_threshold_guaranteed: 20.0,
            max_tech_dominance: 0.5,
            min_tech_categories: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_seconds: 60,
            temperature: 0.7,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    pub fetch: FetchConfig,
    pub quality: QualityThresholds,
    pub diversity: DiversityConfig,
    pub generation: GenerationConfig,
    pub database_url: String,
    pub cache_ttl_hours: i64,
    pub target_count: usize,
    pub fetch_concurrency: usize,
    pub enrich_concurrency: usize,
    pub per_source_timeout_seconds: u64,
    pub max_entries_per_source: usize,
    /// Extra lexicon entries merged over the built-in tables
    pub lexicon_path: Option<PathBuf>,
    /// Source catalog replacing the built-in one
    pub sources_path: Option<PathBuf>,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            quality: QualityThresholds::default(),
            diversity: DiversityConfig::default(),
            generation: GenerationConfig::default(),
            database_url: "sqlite://feed_curator.db".to_string(),
            cache_ttl_hours: 12,
            target_count: 20,
            fetch_concurrency: 10,
            enrich_concurrency: 3,
            per_source_timeout_seconds: 20,
            max_entries_per_source: 8,
            lexicon_path: None,
            sources_path: None,
        }
    }
}

impl CuratorConfig {
    /// Reads the JSON file when given, applies environment overrides and validates
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var("DATABASE_URL") {
            debug!("DATABASE_URL set in environment");
            self.database_url = url;
        }
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.generation.api_key = Some(key);
            }
        }
        if let Ok(raw) = env::var("CURATOR_TARGET_COUNT") {
            self.target_count = raw
                .trim()
                .parse()
                .map_err(|_| CuratorError::Config(format!("CURATOR_TARGET_COUNT is not a count: {}", raw)))?;
        }
        if let Ok(raw) = env::var("CURATOR_MIN_QUALITY_SCORE") {
            self.quality.min_quality_score = raw
                .trim()
                .parse()
                .map_err(|_| CuratorError::Config(format!("CURATOR_MIN_QUALITY_SCORE is not a number: {}", raw)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let total = self.quality.scoring_weights.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(CuratorError::Config(format!("scoring weights must sum to 1.0, got {:.6}", total)));
        }
        for component in ScoreComponent::ALL {
            if self.quality.scoring_weights.weight(component) < 0.0 {
                return Err(CuratorError::Config(format!("weight for {} is negative", component.as_str())));
            }
        }
        if self.quality.min_word_count > self.quality.max_word_count {
            return Err(CuratorError::Config("min_word_count exceeds max_word_count".to_string()));
        }
        if !(1..=MAX_AGE_DAYS_LIMIT).contains(&self.quality.max_age_days) {
            return Err(CuratorError::Config(format!(
                "max_age_days must be between 1 and {}, got {}",
                MAX_AGE_DAYS_LIMIT, self.quality.max_age_days
            )));
        }
        let d = &self.diversity;
        if !(d.max_tech_dominance > 0.0 && d.max_tech_dominance <= 1.0) {
            return Err(CuratorError::Config(format!("max_tech_dominance must be in (0, 1], got {}", d.max_tech_dominance)));
        }
        if d.underrepresented_bonus < 1.0 || d.rare_tech_bonus < 1.0 {
            return Err(CuratorError::Config("diversity bonuses must be at least 1.0".to_string()));
        }
        if d.overrepresented_penalty <= 0.0 || d.overrepresented_penalty > 1.0 {
            return Err(CuratorError::Config("overrepresented_penalty must be in (0, 1]".to_string()));
        }
        if self.target_count == 0 {
            return Err(CuratorError::Config("target_count must be at least 1".to_string()));
        }
        if self.fetch_concurrency == 0 || self.enrich_concurrency == 0 {
            return Err(CuratorError::Config("concurrency limits must be at least 1".to_string()));
        }
        if !(1..=CACHE_TTL_HOURS_LIMIT).contains(&self.cache_ttl_hours) {
            return Err(CuratorError::Config(format!(
                "cache_ttl_hours must be between 1 and {}, got {}",
                CACHE_TTL_HOURS_LIMIT, self.cache_ttl_hours
            )));
        }
        Ok(())
    }
}
