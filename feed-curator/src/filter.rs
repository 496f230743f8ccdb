//! Hard quality gates.
//!
//! Gates run in a fixed order and the first failing gate decides the single
//! rejection reason an article is counted under:
//!
//! 1. usable content, then duplicate title / duplicate content fingerprint
//! 2. title quality (length, clickbait, generic templates)
//! 3. content quality (word band, age, signal to noise)
//! 4. promotional blocklist and promo word density
//! 5. spam indicator heuristic
//! 6. quality score floor
//!
//! Gates 1 to 5 only look at text and dates, so the pipeline runs them as
//! [`ContentFilter::screen`] before scoring and the floor afterwards.

use crate::article::{EnrichedArticle, FilteredArticle, ScoredArticle};
use crate::config::QualityThresholds;
use crate::lexicon::Lexicon;
use crate::utils::{is_stop_word, text};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const MIN_TITLE_CHARS: usize = 10;
const MAX_TITLE_CHARS: usize = 200;
const MIN_CONTENT_CHARS: usize = 50;
const FINGERPRINT_BODY_CHARS: usize = 1000;
const FINGERPRINT_WORDS: usize = 30;
const PROMO_SCAN_CHARS: usize = 2000;
const MAX_PROMO_DENSITY: f64 = 0.05;
const MIN_SIGNAL_RATIO: f64 = 0.15;
const SIGNAL_CHECK_MIN_CHARS: usize = 100;
const SPAM_INDICATOR_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NoContent,
    DuplicateTitle,
    DuplicateContent,
    TitleTooShort,
    TitleTooLong,
    ClickbaitTitle,
    GenericTitle,
    TooShort,
    TooLong,
    TooOld,
    LowQualityContent,
    Promotional,
    SpamIndicators,
    LowScore,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::NoContent => "no_content",
            RejectionReason::DuplicateTitle => "duplicate_title",
            RejectionReason::DuplicateContent => "duplicate_content",
            RejectionReason::TitleTooShort => "title_too_short",
            RejectionReason::TitleTooLong => "title_too_long",
            RejectionReason::ClickbaitTitle => "clickbait_title",
            RejectionReason::GenericTitle => "generic_title",
            RejectionReason::TooShort => "too_short",
            RejectionReason::TooLong => "too_long",
            RejectionReason::TooOld => "too_old",
            RejectionReason::LowQualityContent => "low_quality_content",
            RejectionReason::Promotional => "promotional",
            RejectionReason::SpamIndicators => "spam_indicators",
            RejectionReason::LowScore => "low_score",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count of rejected articles per reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts(BTreeMap<RejectionReason, usize>);

impl RejectionCounts {
    pub fn record(&mut self, reason: RejectionReason) {
        *self.0.entry(reason).or_insert(0) += 1;
    }

    pub fn get(&self, reason: RejectionReason) -> usize {
        self.0.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn merge(&mut self, other: &RejectionCounts) {
        for (reason, count) in &other.0 {
            *self.0.entry(*reason).or_insert(0) += count;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RejectionReason, usize)> + '_ {
        self.0.iter().map(|(reason, count)| (*reason, *count))
    }
}

impl fmt::Display for RejectionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(reason, count)| format!("{}={}", reason, count)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome<T> {
    pub kept: Vec<T>,
    pub rejections: RejectionCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub original_count: usize,
    pub kept_count: usize,
    pub rejected_count: usize,
    /// Percentage of the input that was kept
    pub retention_rate: f64,
    pub top_rejection_reasons: Vec<(RejectionReason, usize)>,
}

impl FilterStats {
    pub fn new(original_count: usize, kept_count: usize, rejections: &RejectionCounts) -> Self {
        let mut top: Vec<(RejectionReason, usize)> = rejections.iter().filter(|(_, count)| *count > 0).collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(5);

        Self {
            original_count,
            kept_count,
            rejected_count: rejections.total(),
            retention_rate: if original_count > 0 {
                kept_count as f64 / original_count as f64 * 100.0
            } else {
                0.0
            },
            top_rejection_reasons: top,
        }
    }
}

/// The fields the gates read
pub trait Screenable {
    fn screen_title(&self) -> &str;
    fn screen_body(&self) -> &str;
    fn screen_summary(&self) -> &str;
    fn screen_published(&self) -> Option<DateTime<Utc>>;
}

impl Screenable for EnrichedArticle {
    fn screen_title(&self) -> &str {
        self.title()
    }

    fn screen_body(&self) -> &str {
        if self.text.trim().is_empty() {
            self.summary()
        } else {
            &self.text
        }
    }

    fn screen_summary(&self) -> &str {
        self.summary()
    }

    fn screen_published(&self) -> Option<DateTime<Utc>> {
        self.published()
    }
}

impl Screenable for ScoredArticle {
    fn screen_title(&self) -> &str {
        self.article.screen_title()
    }

    fn screen_body(&self) -> &str {
        self.article.screen_body()
    }

    fn screen_summary(&self) -> &str {
        self.article.screen_summary()
    }

    fn screen_published(&self) -> Option<DateTime<Utc>> {
        self.article.screen_published()
    }
}

/// Title and content keys of the articles accepted so far
#[derive(Debug, Default)]
struct SeenKeys {
    titles: HashSet<String>,
    fingerprints: HashSet<String>,
}

struct ArticleKeys {
    title: String,
    fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct ContentFilter {
    lexicon: Arc<Lexicon>,
    thresholds: QualityThresholds,
}

impl ContentFilter {
    pub fn new(lexicon: Arc<Lexicon>, thresholds: QualityThresholds) -> Self {
        Self { lexicon, thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Gates 1 to 5 on articles that have not been scored yet
    pub fn screen(&self, articles: Vec<EnrichedArticle>, now: DateTime<Utc>) -> FilterOutcome<EnrichedArticle> {
        let total = articles.len();
        let outcome = self.run_gates(articles, now, |_| None);
        info!(
            "Screening kept {}/{} articles, rejections {}",
            outcome.kept.len(),
            total,
            outcome.rejections
        );
        outcome
    }

    /// Gate 6 only
    pub fn apply_score_floor(&self, articles: Vec<ScoredArticle>) -> FilterOutcome<FilteredArticle> {
        let total = articles.len();
        let mut rejections = RejectionCounts::default();
        let mut kept = Vec::with_capacity(total);

        for article in articles {
            if article.quality_score < self.thresholds.min_quality_score {
                debug!("Rejected '{}': low_score ({:.1})", article.title(), article.quality_score);
                rejections.record(RejectionReason::LowScore);
            } else {
                kept.push(FilteredArticle(article));
            }
        }

        info!("Score floor kept {}/{} articles", kept.len(), total);
        FilterOutcome { kept, rejections }
    }

    /// All six gates on scored articles
    pub fn filter(&self, articles: Vec<ScoredArticle>, now: DateTime<Utc>) -> FilterOutcome<FilteredArticle> {
        let total = articles.len();
        let floor = self.thresholds.min_quality_score;
        let outcome = self.run_gates(articles, now, |article: &ScoredArticle| {
            (article.quality_score < floor).then_some(RejectionReason::LowScore)
        });
        info!(
            "Filtering kept {}/{} articles, rejections {}",
            outcome.kept.len(),
            total,
            outcome.rejections
        );
        FilterOutcome {
            kept: outcome.kept.into_iter().map(FilteredArticle).collect(),
            rejections: outcome.rejections,
        }
    }

    fn run_gates<T, F>(&self, articles: Vec<T>, now: DateTime<Utc>, final_gate: F) -> FilterOutcome<T>
    where
        T: Screenable,
        F: Fn(&T) -> Option<RejectionReason>,
    {
        let mut seen = SeenKeys::default();
        let mut rejections = RejectionCounts::default();
        let mut kept = Vec::new();

        for article in articles {
            let verdict = self
                .first_failure(&article, &seen, now)
                .or_else(|| final_gate(&article));

            match verdict {
                Some(reason) => {
                    debug!("Rejected '{}': {}", article.screen_title(), reason);
                    rejections.record(reason);
                }
                None => {
                    let keys = self.keys(&article);
                    seen.titles.insert(keys.title);
                    seen.fingerprints.insert(keys.fingerprint);
                    kept.push(article);
                }
            }
        }

        FilterOutcome { kept, rejections }
    }

    fn first_failure<T: Screenable>(&self, article: &T, seen: &SeenKeys, now: DateTime<Utc>) -> Option<RejectionReason> {
        if !self.has_valid_content(article) {
            return Some(RejectionReason::NoContent);
        }

        let keys = self.keys(article);
        if !keys.title.is_empty() && seen.titles.contains(&keys.title) {
            return Some(RejectionReason::DuplicateTitle);
        }
        if seen.fingerprints.contains(&keys.fingerprint) {
            return Some(RejectionReason::DuplicateContent);
        }

        self.check_title(article.screen_title())
            .or_else(|| self.check_content(article.screen_body(), article.screen_published(), now))
            .or_else(|| self.is_promotional(article).then_some(RejectionReason::Promotional))
            .or_else(|| self.has_spam_indicators(article).then_some(RejectionReason::SpamIndicators))
    }

    /// Every gate a single article fails, ignoring duplicates
    pub fn validate_article<T: Screenable>(
        &self,
        article: &T,
        quality_score: Option<f64>,
        now: DateTime<Utc>,
    ) -> Vec<RejectionReason> {
        let mut issues = Vec::new();
        if !self.has_valid_content(article) {
            issues.push(RejectionReason::NoContent);
        }
        if let Some(reason) = self.check_title(article.screen_title()) {
            issues.push(reason);
        }
        if let Some(reason) = self.check_content(article.screen_body(), article.screen_published(), now) {
            issues.push(reason);
        }
        if self.is_promotional(article) {
            issues.push(RejectionReason::Promotional);
        }
        if self.has_spam_indicators(article) {
            issues.push(RejectionReason::SpamIndicators);
        }
        if quality_score.unwrap_or(0.0) < self.thresholds.min_quality_score {
            issues.push(RejectionReason::LowScore);
        }
        issues
    }

    fn has_valid_content<T: Screenable>(&self, article: &T) -> bool {
        article.screen_title().trim().chars().count() > MIN_TITLE_CHARS
            && article.screen_body().trim().chars().count() > MIN_CONTENT_CHARS
    }

    fn keys<T: Screenable>(&self, article: &T) -> ArticleKeys {
        ArticleKeys {
            title: normalize_title(article.screen_title()),
            fingerprint: content_fingerprint(article.screen_title(), article.screen_body()),
        }
    }

    fn check_title(&self, title: &str) -> Option<RejectionReason> {
        let length = title.trim().chars().count();
        if length < MIN_TITLE_CHARS {
            return Some(RejectionReason::TitleTooShort);
        }
        if length > MAX_TITLE_CHARS {
            return Some(RejectionReason::TitleTooLong);
        }
        if self.lexicon.clickbait_titles.iter().any(|p| p.is_match(title)) {
            return Some(RejectionReason::ClickbaitTitle);
        }
        if self.lexicon.generic_titles.iter().any(|p| p.is_match(title.trim())) {
            return Some(RejectionReason::GenericTitle);
        }
        None
    }

    fn check_content(&self, body: &str, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<RejectionReason> {
        let words = text::word_count(body);
        if words < self.thresholds.min_word_count {
            return Some(RejectionReason::TooShort);
        }
        if words > self.thresholds.max_word_count {
            return Some(RejectionReason::TooLong);
        }
        if let Some(published) = published {
            if now.signed_duration_since(published) > Duration::days(self.thresholds.max_age_days) {
                return Some(RejectionReason::TooOld);
            }
        }
        if !self.has_good_signal_to_noise(body) {
            return Some(RejectionReason::LowQualityContent);
        }
        None
    }

    fn has_good_signal_to_noise(&self, body: &str) -> bool {
        if body.chars().count() < SIGNAL_CHECK_MIN_CHARS {
            return true;
        }

        let technical = self.lexicon.technical_vocabulary.find_iter(body).count();
        let noise = self.lexicon.noise_phrases.find_iter(body).count();

        match (technical, noise) {
            (0, 0) => true,
            (0, _) => false,
            (technical, noise) => technical as f64 / (technical + noise) as f64 >= MIN_SIGNAL_RATIO,
        }
    }

    fn is_promotional<T: Screenable>(&self, article: &T) -> bool {
        let head: String = article.screen_body().chars().take(PROMO_SCAN_CHARS).collect();
        let full_text = format!("{} {} {}", article.screen_title(), article.screen_summary(), head).to_lowercase();

        if self.lexicon.promotional.iter().any(|p| p.is_match(&full_text)) {
            return true;
        }

        let total_words = text::word_count(&full_text);
        if total_words == 0 {
            return false;
        }
        let present: HashSet<String> = text::words(&full_text)
            .into_iter()
            .filter(|word| self.lexicon.promo_words.contains(word))
            .collect();
        present.len() as f64 / total_words as f64 > MAX_PROMO_DENSITY
    }

    fn has_spam_indicators<T: Screenable>(&self, article: &T) -> bool {
        let title = article.screen_title();
        let body = article.screen_body();
        let title_chars = title.chars().count().max(1) as f64;
        let title_words: Vec<&str> = title.split_whitespace().collect();
        let unique_words: HashSet<String> = title_words.iter().map(|w| w.to_lowercase()).collect();

        let indicators = [
            title.chars().filter(|c| is_emoji(*c)).count() > 3,
            title.chars().filter(|c| c.is_ascii_uppercase()).count() as f64 / title_chars > 0.5,
            title.chars().filter(|c| matches!(c, '!' | '?')).count() > 3,
            (unique_words.len() as f64 / title_words.len().max(1) as f64) < 0.6,
            title_words.iter().filter(|w| w.chars().count() > 1 && is_all_caps(w)).count() > 2,
            self.lexicon.shortener_hosts.is_match(body),
        ];

        indicators.iter().filter(|hit| **hit).count() >= SPAM_INDICATOR_LIMIT
    }
}

/// Lowercased significant title words, at most ten, joined by spaces
pub fn normalize_title(title: &str) -> String {
    text::words(title)
        .into_iter()
        .filter(|word| word.chars().count() > 2 && !is_stop_word(word))
        .take(10)
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 over the sorted set of the first thirty long words of the title
/// and body head. Re-titled syndication of the same story collides here.
pub fn content_fingerprint(title: &str, body: &str) -> String {
    let head: String = body.chars().take(FINGERPRINT_BODY_CHARS).collect();
    let important: BTreeSet<String> = text::words(&format!("{} {}", title, head))
        .into_iter()
        .filter(|word| word.chars().count() > 4)
        .take(FINGERPRINT_WORDS)
        .collect();

    let signature = important.into_iter().collect::<Vec<_>>().join(" ");
    let mut hasher = Sha256::new();
    hasher.update(signature.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F600..=0x1F64F | 0x1F300..=0x1F5FF | 0x1F680..=0x1F6FF | 0x1F1E0..=0x1F1FF
    )
}

/// At least one cased character and no lowercase ones
fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}
