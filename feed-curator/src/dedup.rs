//! Near-duplicate removal by title signature.
//!
//! A signature is the set of the first ten significant words of a title
//! (lowercased, stop words and words of two letters or fewer dropped). A
//! candidate is a duplicate of a kept article when their signatures share at
//! least `min(3, 0.7 × |candidate signature|)` words. Signatures of fewer
//! than three words only match an identical signature.

use crate::article::{EnrichedArticle, RawArticle};
use crate::utils::{is_stop_word, text};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

const MAX_SIGNATURE_WORDS: usize = 10;
const MIN_SIGNIFICANT_WORDS: usize = 3;
const MAX_REQUIRED_OVERLAP: f64 = 3.0;
const OVERLAP_RATIO: f64 = 0.7;

/// Anything with a title and a link can be deduplicated
pub trait Headline {
    fn headline(&self) -> &str;
    fn link(&self) -> &str;
}

impl Headline for RawArticle {
    fn headline(&self) -> &str {
        &self.title
    }

    fn link(&self) -> &str {
        &self.url
    }
}

impl Headline for EnrichedArticle {
    fn headline(&self) -> &str {
        self.title()
    }

    fn link(&self) -> &str {
        self.url()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSignature(BTreeSet<String>);

impl TitleSignature {
    pub fn from_title(title: &str) -> Self {
        let words = text::words(title);
        let significant: Vec<&String> = words
            .iter()
            .filter(|word| word.chars().count() > 2 && !is_stop_word(word))
            .take(MAX_SIGNATURE_WORDS)
            .collect();

        if significant.len() < MIN_SIGNIFICANT_WORDS {
            // Short titles keep every word so they still need a real overlap to match
            return Self(words.into_iter().collect());
        }
        Self(significant.into_iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn overlap(&self, other: &TitleSignature) -> usize {
        self.0.intersection(&other.0).count()
    }

    /// Whether `self`, as a new candidate, duplicates the already kept `kept`
    pub fn duplicates(&self, kept: &TitleSignature) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.len() < MIN_SIGNIFICANT_WORDS {
            // Too few words for a ratio, only an identical signature matches
            return self == kept;
        }
        let required = MAX_REQUIRED_OVERLAP.min(OVERLAP_RATIO * self.len() as f64);
        self.overlap(kept) as f64 >= required
    }
}

#[derive(Debug, Default)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Keeps the first article of every duplicate group, preserving input order
    pub fn dedupe<T: Headline>(&self, articles: Vec<T>) -> Vec<T> {
        let before = articles.len();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut kept_signatures: Vec<TitleSignature> = Vec::new();
        let mut kept = Vec::with_capacity(articles.len());

        for article in articles {
            if !seen_urls.insert(article.link().to_string()) {
                debug!("Dropping repeated URL {}", article.link());
                continue;
            }

            let signature = TitleSignature::from_title(article.headline());
            if let Some(existing) = kept_signatures.iter().find(|kept| signature.duplicates(kept)) {
                debug!(
                    "Dropping near-duplicate '{}' (overlap {} words)",
                    article.headline(),
                    signature.overlap(existing)
                );
                continue;
            }

            kept_signatures.push(signature);
            kept.push(article);
        }

        info!("Deduplication kept {}/{} articles", kept.len(), before);
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::SourceProfile;

    fn article(url: &str, title: &str) -> RawArticle {
        RawArticle::new(url, title, SourceProfile::new("Test", 7.0))
    }

    fn titles(articles: &[RawArticle]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_signature_drops_stop_words_and_short_words() {
        let signature = TitleSignature::from_title("How to build a fast HTTP server in Rust with Tokio");
        let words: Vec<&str> = signature.words().collect();
        assert_eq!(words, vec!["build", "fast", "http", "rust", "server", "tokio"]);
    }

    #[test]
    fn test_signature_truncates_to_ten_words() {
        let signature = TitleSignature::from_title(
            "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima",
        );
        assert_eq!(signature.len(), 10);
        assert!(!signature.words().any(|w| w == "kilo"));
    }

    #[test]
    fn test_short_title_falls_back_to_all_words() {
        let signature = TitleSignature::from_title("Go 1.23 is out");
        assert_eq!(signature.len(), 5);
        assert!(signature.words().any(|w| w == "go"));
    }

    #[test]
    fn test_near_duplicates_collapse_to_first() {
        let articles = vec![
            article("https://a.dev/1", "React 19 released with new compiler and actions"),
            article("https://b.dev/2", "Tokio adds io_uring support"),
            article("https://c.dev/3", "React 19 officially released: compiler, actions and more"),
        ];
        let kept = Deduplicator::new().dedupe(articles);
        assert_eq!(
            titles(&kept),
            vec!["React 19 released with new compiler and actions", "Tokio adds io_uring support"]
        );
    }

    #[test]
    fn test_one_word_title_needs_an_exact_match() {
        let articles = vec![
            article("https://a.dev/1", "Rust 1.80 stabilizes lazy cell types"),
            article("https://a.dev/2", "Rust"),
            article("https://a.dev/3", "Rust!"),
            article("https://a.dev/4", "Python"),
        ];
        let kept = Deduplicator::new().dedupe(articles);
        assert_eq!(titles(&kept), vec!["Rust 1.80 stabilizes lazy cell types", "Rust", "Python"]);
    }

    #[test]
    fn test_repeated_url_dropped() {
        let articles = vec![
            article("https://a.dev/1", "Understanding Rust lifetimes deeply"),
            article("https://a.dev/1", "Completely different headline about Python packaging"),
        ];
        assert_eq!(Deduplicator::new().dedupe(articles).len(), 1);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let articles = vec![
            article("https://a.dev/1", "Vue 3.5 brings reactive props destructure"),
            article("https://a.dev/2", "Vue 3.5 reactive props destructure explained"),
            article("https://a.dev/3", "Svelte 5 runes are stable"),
            article("https://a.dev/4", "Angular signals land in version 18"),
        ];
        let dedup = Deduplicator::new();
        let once = dedup.dedupe(articles);
        let twice = dedup.dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_overlap_is_order_independent() {
        let first = article("https://a.dev/1", "Kubernetes 1.31 release notes networking storage changes");
        let second = article("https://a.dev/2", "Kubernetes 1.31 storage networking changes summarized");
        let dedup = Deduplicator::new();
        assert_eq!(dedup.dedupe(vec![first.clone(), second.clone()]).len(), 1);
        assert_eq!(dedup.dedupe(vec![second, first]).len(), 1);
    }
}
