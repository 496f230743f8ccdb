use feed_curator::sources::SourceCatalog;
use feed_curator::{CuratorConfig, CuratorError, Domain, Lexicon, SourceKind};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::info;

fn json_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_config_file_overrides_defaults() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    info!("Testing configuration loading from a file");
    let file = json_file(
        r#"{
            "quality": {"min_quality_score": 25.0, "max_age_days": 7},
            "diversity": {"max_tech_dominance": 0.4, "min_tech_categories": 2},
            "fetch": {"max_retries": 1},
            "cache_ttl_hours": 6
        }"#,
    );

    let config = CuratorConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.quality.max_age_days, 7);
    assert_eq!(config.diversity.max_tech_dominance, 0.4);
    assert_eq!(config.diversity.min_tech_categories, 2);
    assert_eq!(config.fetch.max_retries, 1);
    assert_eq!(config.cache_ttl_hours, 6);
    assert_eq!(config.quality.min_word_count, 50);
    assert_eq!(config.diversity.quality_threshold_guaranteed, 20.0);
}

#[tokio::test]
async fn test_invalid_config_file_is_refused() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    let unbalanced = json_file(r#"{"quality": {"scoring_weights": {"freshness": 0.4}}}"#);
    assert!(matches!(CuratorConfig::load(Some(unbalanced.path())), Err(CuratorError::Config(_))));

    let zero_target = json_file(r#"{"target_count": 0}"#);
    assert!(matches!(CuratorConfig::load(Some(zero_target.path())), Err(CuratorError::Config(_))));

    let garbage = json_file("not json at all");
    assert!(matches!(CuratorConfig::load(Some(garbage.path())), Err(CuratorError::Serialization(_))));
}

#[tokio::test]
async fn test_lexicon_file_extends_builtin_tables() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    let file = json_file(
        r#"{
            "technologies": {"frontend": [{"name": "solid", "patterns": ["\\bsolid\\s?js\\b"]}]},
            "clickbait_titles": ["nobody tells you"]
        }"#,
    );

    let lexicon = Lexicon::load(Some(file.path())).unwrap();

    assert!(lexicon.has_technology(Domain::Frontend, "solid"));
    assert!(lexicon.has_technology(Domain::Frontend, "react"));
    assert!(lexicon.clickbait_titles.iter().any(|p| p.is_match("What nobody tells you about hydration")));
}

#[tokio::test]
async fn test_catalog_file_replaces_builtin_sources() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    let file = json_file(
        r#"{
            "backend": [
                {"name": "Internal Eng", "url": "https://eng.example.com/feed.xml", "weight": 7.5, "kind": "expert", "technology": "go"}
            ]
        }"#,
    );

    let catalog = SourceCatalog::load(Some(file.path())).unwrap();

    assert!(catalog.for_domain(Domain::Frontend).is_empty());
    let backend = catalog.for_domain(Domain::Backend);
    assert_eq!(backend.len(), 1);
    let profile = backend[0].profile();
    assert_eq!(profile.name, "Internal Eng");
    assert_eq!(profile.kind, SourceKind::Expert);
    assert_eq!(profile.technology.as_deref(), Some("go"));
    assert!(profile.focus.is_none());
}
