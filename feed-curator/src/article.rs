//! Article records as they move through the curation stages.
//!
//! Each stage consumes the record type produced by the stage before it and
//! returns a richer one, so a value's type says which annotations exist:
//!
//! `RawArticle` → `EnrichedArticle` → `ScoredArticle` → `FilteredArticle`
//! → `CategorizedArticle` → `SelectedArticle`

use crate::types::{Domain, ExtractionQuality, ScoreComponent, SelectionReason, SourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// What the scorer needs to know about the feed an article came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub name: String,
    /// Authority weight on a 0-10 scale
    pub weight: f64,
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub focus: Option<String>,
    /// Technology the source is dedicated to, if any
    #[serde(default)]
    pub technology: Option<String>,
}

impl SourceProfile {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            kind: SourceKind::Other,
            focus: None,
            technology: None,
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }
}

/// A candidate item as produced by the fetch layer. The URL is its identity within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Full body when the feed itself carried one
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    pub source: SourceProfile,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RawArticle {
    pub fn new(url: impl Into<String>, title: impl Into<String>, source: SourceProfile) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            summary: String::new(),
            content: None,
            published: None,
            source,
            tags: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Best text the record already carries: feed body, else summary
    pub fn best_text(&self) -> &str {
        match self.content.as_deref() {
            Some(content) if !content.trim().is_empty() => content,
            _ => &self.summary,
        }
    }
}

/// Raw article plus the body text the scorer and filter work on.
///
/// `text` is only empty when both the extraction and the summary were empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    pub raw: RawArticle,
    pub text: String,
    pub extraction_quality: ExtractionQuality,
}

impl EnrichedArticle {
    /// Minimum extracted length for the body to count as a full extraction
    pub const FULL_EXTRACTION_MIN_CHARS: usize = 200;

    /// Builds the record from an extraction attempt. Failures and thin
    /// extractions fall back to the best text the feed provided.
    pub fn from_extraction(raw: RawArticle, extraction: crate::Result<Option<String>>) -> Self {
        match extraction {
            Ok(Some(body)) if body.chars().count() > Self::FULL_EXTRACTION_MIN_CHARS => Self {
                raw,
                text: body,
                extraction_quality: ExtractionQuality::Full,
            },
            Ok(_) => Self::with_fallback(raw, ExtractionQuality::SummaryOnly),
            Err(_) => Self::with_fallback(raw, ExtractionQuality::Error),
        }
    }

    /// Keeps the feed-provided text without attempting an extraction
    pub fn with_fallback(raw: RawArticle, quality: ExtractionQuality) -> Self {
        let text = raw.best_text().to_string();
        Self {
            raw,
            text,
            extraction_quality: quality,
        }
    }

    pub fn title(&self) -> &str {
        &self.raw.title
    }

    pub fn url(&self) -> &str {
        &self.raw.url
    }

    pub fn summary(&self) -> &str {
        &self.raw.summary
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.raw.published
    }

    pub fn source(&self) -> &SourceProfile {
        &self.raw.source
    }
}

/// Per-component values in [0, 1], before weighting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown(pub BTreeMap<ScoreComponent, f64>);

impl ScoreBreakdown {
    pub fn get(&self, component: ScoreComponent) -> f64 {
        self.0.get(&component).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, component: ScoreComponent, value: f64) {
        self.0.insert(component, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreComponent, f64)> + '_ {
        self.0.iter().map(|(component, value)| (*component, *value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: EnrichedArticle,
    pub domain: Domain,
    pub quality_score: f64,
    pub breakdown: ScoreBreakdown,
}

impl Deref for ScoredArticle {
    type Target = EnrichedArticle;

    fn deref(&self) -> &Self::Target {
        &self.article
    }
}

/// A scored article that passed every filter gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredArticle(pub ScoredArticle);

impl FilteredArticle {
    pub fn into_inner(self) -> ScoredArticle {
        self.0
    }
}

impl Deref for FilteredArticle {
    type Target = ScoredArticle;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedArticle {
    pub scored: ScoredArticle,
    pub primary_technology: String,
    /// Raw detection score of every technology that matched
    pub technology_scores: BTreeMap<String, u32>,
}

impl CategorizedArticle {
    pub const GENERAL: &'static str = "general";

    pub fn is_general(&self) -> bool {
        self.primary_technology == Self::GENERAL
    }

    pub fn quality_score(&self) -> f64 {
        self.scored.quality_score
    }
}

impl Deref for CategorizedArticle {
    type Target = ScoredArticle;

    fn deref(&self) -> &Self::Target {
        &self.scored
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedArticle {
    pub categorized: CategorizedArticle,
    pub hybrid_score: f64,
    pub selection_reason: SelectionReason,
}

impl SelectedArticle {
    pub fn primary_technology(&self) -> &str {
        &self.categorized.primary_technology
    }

    /// Detected technologies, strongest first
    pub fn technologies(&self) -> Vec<&str> {
        let mut technologies: Vec<(&String, &u32)> = self.categorized.technology_scores.iter().collect();
        technologies.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        technologies.into_iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Deref for SelectedArticle {
    type Target = CategorizedArticle;

    fn deref(&self) -> &Self::Target {
        &self.categorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawArticle {
        RawArticle::new("https://example.com/a", "Tokio 1.40 ships cooperative scheduling", SourceProfile::new("Tokio Blog", 9.0))
            .with_summary("Short feed summary of the release notes.")
    }

    #[test]
    fn test_failed_extraction_keeps_summary() {
        let enriched = EnrichedArticle::from_extraction(raw(), Err(crate::CuratorError::General("boom".into())));
        assert_eq!(enriched.extraction_quality, ExtractionQuality::Error);
        assert_eq!(enriched.text, "Short feed summary of the release notes.");
    }

    #[test]
    fn test_thin_extraction_is_summary_only() {
        let enriched = EnrichedArticle::from_extraction(raw(), Ok(Some("tiny".into())));
        assert_eq!(enriched.extraction_quality, ExtractionQuality::SummaryOnly);
        assert!(!enriched.text.is_empty());
    }

    #[test]
    fn test_full_extraction_replaces_summary() {
        let body = "word ".repeat(100);
        let enriched = EnrichedArticle::from_extraction(raw(), Ok(Some(body.clone())));
        assert_eq!(enriched.extraction_quality, ExtractionQuality::Full);
        assert_eq!(enriched.text, body);
    }

    #[test]
    fn test_feed_content_preferred_over_summary() {
        let article = raw().with_content("Feed carried the whole post body here.");
        assert_eq!(article.best_text(), "Feed carried the whole post body here.");
    }
}
