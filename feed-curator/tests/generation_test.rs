use chrono::{Duration, TimeZone, Utc};
use feed_curator::generator::{build_prompt, content_type, freshness_label};
use feed_curator::{
    CategorizedArticle, CuratorError, Domain, EnrichedArticle, ExtractionQuality, MockCompletion, PostGenerator,
    RawArticle, ScoreBreakdown, ScoredArticle, SelectedArticle, SelectionReason, SourceProfile,
};
use rstest::rstest;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

fn selected(index: usize, title: &str, technology: &str) -> SelectedArticle {
    let raw = RawArticle::new(
        format!("https://news.dev/{}", index),
        title,
        SourceProfile::new(format!("Source {}", index), 8.0),
    )
    .with_summary(format!("Summary of {}", title))
    .with_published(Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap());

    let quality = 60.0 - index as f64;
    SelectedArticle {
        categorized: CategorizedArticle {
            scored: ScoredArticle {
                article: EnrichedArticle::with_fallback(raw, ExtractionQuality::SummaryOnly),
                domain: Domain::Frontend,
                quality_score: quality,
                breakdown: ScoreBreakdown::default(),
            },
            primary_technology: technology.to_string(),
            technology_scores: BTreeMap::from([(technology.to_string(), 3)]),
        },
        hybrid_score: quality,
        selection_reason: SelectionReason::HybridScore,
    }
}

fn batch(count: usize) -> Vec<SelectedArticle> {
    (0..count)
        .map(|i| selected(i, &format!("Component patterns part {}", i + 1), if i % 2 == 0 { "react" } else { "css" }))
        .collect()
}

#[rstest]
#[case(0)]
#[case(1)]
#[tokio::test]
async fn test_too_few_articles_never_reach_the_service(#[case] count: usize) {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    let completion = Arc::new(MockCompletion::new("should not be used"));
    let generator = PostGenerator::new(completion.clone());

    let err = generator.generate(Domain::Frontend, &batch(count)).await.unwrap_err();

    assert!(matches!(err, CuratorError::InsufficientSources { required: 2, actual } if actual == count));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_generated_post_cites_every_prompt_article() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    info!("Testing post generation with a canned reply");
    let completion = Arc::new(MockCompletion::new("  Styling and state, one week in review. #Frontend #CSS  "));
    let generator = PostGenerator::new(completion.clone());
    let now = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();

    let post = generator.generate_at(Domain::Frontend, &batch(3), now).await.unwrap();

    assert_eq!(completion.calls(), 1);
    assert_eq!(post.domain, Domain::Frontend);
    assert_eq!(post.generated_at, now);
    assert_eq!(post.sources().len(), 3);
    assert_eq!(post.hashtags, vec!["#frontend".to_string(), "#css".to_string()]);
    assert!(post.content.starts_with("Styling and state, one week in review."));
    for source in post.sources() {
        assert!(post.content.contains(&source.url), "{} missing from appendix", source.url);
    }
}

#[tokio::test]
async fn test_prompt_is_capped_at_eight_articles() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    let generator = PostGenerator::new(Arc::new(MockCompletion::new("A busy week.")));
    let post = generator.generate(Domain::Frontend, &batch(11)).await.unwrap();

    assert_eq!(post.sources().len(), 8);
    assert!(!post.content.contains("https://news.dev/8"));
}

#[tokio::test]
async fn test_service_failures_propagate() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    let failing = Arc::new(MockCompletion::failing());
    let err = PostGenerator::new(failing.clone())
        .generate(Domain::Frontend, &batch(2))
        .await
        .unwrap_err();
    assert!(matches!(err, CuratorError::Generation(_)));
    assert_eq!(failing.calls(), 1);

    let empty = Arc::new(MockCompletion::new("   \n"));
    let err = PostGenerator::new(empty).generate(Domain::Frontend, &batch(2)).await.unwrap_err();
    assert!(matches!(err, CuratorError::Generation(_)));
}

#[test]
fn test_prompt_lists_articles_with_context() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let articles = vec![
        selected(0, "A complete guide to container queries", "css"),
        selected(1, "React 19 released with actions", "react"),
    ];

    let prompt = build_prompt(Domain::Frontend, &articles, now);

    assert!(prompt.contains("SOURCES (2 articles):"));
    assert!(prompt.contains("1. Source 0: \"A complete guide to container queries\""));
    assert!(prompt.contains("technologies: css; type: tutorial; freshness: hot"));
    assert!(prompt.contains("type: news"));
}

#[rstest]
#[case("A complete guide to container queries", "tutorial")]
#[case("React 19 released with actions", "news")]
#[case("Vite vs Webpack in 2026", "comparison")]
#[case("Ten tips for faster CSS", "tips")]
#[case("Tokio internals for application authors", "deep_dive")]
#[case("Notes from the platform team", "article")]
fn test_content_type(#[case] title: &str, #[case] expected: &str) {
    assert_eq!(content_type(title), expected);
}

#[rstest]
#[case(Some(1), "hot")]
#[case(Some(12), "fresh")]
#[case(Some(30), "recent")]
#[case(Some(60), "relevant")]
#[case(Some(200), "older")]
#[case(None, "unknown")]
fn test_freshness_label(#[case] age_hours: Option<i64>, #[case] expected: &str) {
    let now = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
    let published = age_hours.map(|hours| now - Duration::hours(hours));
    assert_eq!(freshness_label(published, now), expected);
}
