use crate::article::SelectedArticle;
use crate::config::GenerationConfig;
use crate::post::{Post, SourceRef, MIN_POST_SOURCES};
use crate::traits::TextCompletion;
use crate::types::{CuratorError, Domain, Result};
use crate::utils::{text::words, time::age_hours};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Articles beyond this many are left out of the prompt
pub const MAX_PROMPT_ARTICLES: usize = 8;

struct DomainBrief {
    name: &'static str,
    focus: &'static str,
    angle: &'static str,
}

fn brief(domain: Domain) -> DomainBrief {
    match domain {
        Domain::Frontend => DomainBrief {
            name: "Frontend development",
            focus: "user interfaces, JavaScript frameworks, CSS, user experience",
            angle: "frameworks, UI tooling and client-side performance",
        },
        Domain::Backend => DomainBrief {
            name: "Backend development",
            focus: "servers, APIs, databases, software architecture",
            angle: "runtimes, data stores, scalability and operations",
        },
        Domain::Ai => DomainBrief {
            name: "Artificial intelligence",
            focus: "machine learning, generative AI, language models, AI tooling",
            angle: "models, research results and production use of AI",
        },
        Domain::General => DomainBrief {
            name: "General tech news",
            focus: "developer tools, DevOps, new technologies, the tech industry",
            angle: "platform changes, security and industry moves",
        },
    }
}

/// Rough kind of piece a title announces
pub fn content_type(title: &str) -> &'static str {
    const KINDS: [(&str, &[&str]); 5] = [
        ("tutorial", &["tutorial", "guide", "how to", "getting started"]),
        ("news", &["releases", "released", "announces", "announcing", "launches", "introduces", "ships"]),
        ("comparison", &["vs", "versus", "comparison", "comparing"]),
        ("tips", &["tips", "tricks", "best practices", "mistakes"]),
        ("deep_dive", &["deep dive", "under the hood", "internals", "explained"]),
    ];

    let padded = format!(" {} ", words(title).join(" "));
    KINDS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|phrase| padded.contains(&format!(" {} ", phrase))))
        .map(|(kind, _)| *kind)
        .unwrap_or("article")
}

/// Age bucket shown next to each article in the prompt
pub fn freshness_label(published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> &'static str {
    let Some(published) = published else {
        return "unknown";
    };
    match age_hours(published, now) {
        h if h < 6.0 => "hot",
        h if h < 24.0 => "fresh",
        h if h < 48.0 => "recent",
        h if h < 72.0 => "relevant",
        _ => "older",
    }
}

/// Turns a curated selection into a post through a text-completion service
pub struct PostGenerator {
    client: Arc<dyn TextCompletion>,
}

impl PostGenerator {
    pub fn new(client: Arc<dyn TextCompletion>) -> Self {
        Self { client }
    }

    pub async fn generate(&self, domain: Domain, articles: &[SelectedArticle]) -> Result<Post> {
        self.generate_at(domain, articles, Utc::now()).await
    }

    /// Fails with `InsufficientSources` before any service call when fewer
    /// than two articles are given. An empty reply is a generation failure.
    pub async fn generate_at(&self, domain: Domain, articles: &[SelectedArticle], now: DateTime<Utc>) -> Result<Post> {
        if articles.len() < MIN_POST_SOURCES {
            return Err(CuratorError::InsufficientSources {
                required: MIN_POST_SOURCES,
                actual: articles.len(),
            });
        }

        let articles = &articles[..articles.len().min(MAX_PROMPT_ARTICLES)];
        let prompt = build_prompt(domain, articles, now);
        debug!("Prompt for {} post: {} chars", domain, prompt.len());

        let reply = match self.client.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("{} failed to generate a {} post: {}", self.client.name(), domain, e);
                return Err(e);
            }
        };
        let body = reply.trim();
        if body.is_empty() {
            error!("{} returned an empty reply for {}", self.client.name(), domain);
            return Err(CuratorError::Generation(format!("{} returned no text", self.client.name())));
        }

        let sources: Vec<SourceRef> = articles.iter().map(SourceRef::from).collect();
        let content = format!("{}\n\n{}", body, sources_appendix(domain, &sources));
        let post = Post::new(content, domain, sources, now)?;

        info!("Generated {} post from {} articles ({} hashtags)", domain, articles.len(), post.hashtags.len());
        Ok(post)
    }
}

/// Structured article summary plus the domain instructions
pub fn build_prompt(domain: Domain, articles: &[SelectedArticle], now: DateTime<Utc>) -> String {
    let brief = brief(domain);
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are a technology journalist covering {}. Write a LinkedIn post that synthesises the latest news below.",
        brief.name.to_lowercase()
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "FOCUS: {}", brief.focus);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "SOURCES ({} articles):", articles.len());

    for (i, article) in articles.iter().enumerate() {
        let technologies = article.technologies();
        let technologies = if technologies.is_empty() {
            article.primary_technology().to_string()
        } else {
            technologies.join(", ")
        };
        let _ = writeln!(
            prompt,
            "{}. {}: \"{}\" [technologies: {}; type: {}; freshness: {}]",
            i + 1,
            article.source().name,
            article.title(),
            technologies,
            content_type(article.title()),
            freshness_label(article.published(), now)
        );
    }

    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "INSTRUCTIONS:");
    let _ = writeln!(prompt, "1. Keep a factual, specialised tone; no personal opinions.");
    let _ = writeln!(prompt, "2. Concentrate on {}.", brief.angle);
    let _ = writeln!(prompt, "3. Explain what each development means for practitioners.");
    let _ = writeln!(prompt, "4. Cite sources in parentheses.");
    let _ = writeln!(prompt, "5. Stay within 300 to 400 words and end with three to five hashtags.");
    prompt
}

/// Numbered list of the cited articles appended to every post
pub fn sources_appendix(domain: Domain, sources: &[SourceRef]) -> String {
    let mut appendix = format!("SOURCES ({}):\n", domain.as_str().to_uppercase());
    for (i, source) in sources.iter().enumerate() {
        let _ = write!(appendix, "\n{}. {} - \"{}\"\n   {}", i + 1, source.source, source.title, source.url);
    }
    appendix
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: RequestGenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    config: GenerationConfig,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CuratorError::Config("GEMINI_API_KEY is not set".to_string()))?;
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_seconds)).build()?;
        Ok(Self { client, config, api_key })
    }
}

#[async_trait]
impl TextCompletion for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.config.endpoint.trim_end_matches('/'), self.config.model);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: RequestGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CuratorError::Timeout {
                        what: format!("{} completion", self.config.model),
                        seconds: self.config.timeout_seconds,
                    }
                } else {
                    CuratorError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CuratorError::Generation(format!(
                "{} answered HTTP {}: {}",
                self.config.model,
                status.as_u16(),
                detail.chars().take(200).collect::<String>()
            )));
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();
        Ok(text)
    }
}

/// Canned completion for dry runs and tests; counts how often it is called
pub struct MockCompletion {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl MockCompletion {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock whose every call fails
    pub fn failing() -> Self {
        Self { reply: None, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletion for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| CuratorError::Generation("mock completion failure".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_content_type_matches_whole_words() {
        assert_eq!(content_type("How to profile async Rust"), "tutorial");
        assert_eq!(content_type("Deno vs Bun in 2024"), "comparison");
        assert_eq!(content_type("Painting on canvas with WebGPU"), "article");
        assert_eq!(content_type("React compiler internals explained"), "deep_dive");
        assert_eq!(content_type("Vite 6 ships environment API"), "news");
    }

    #[test]
    fn test_freshness_labels() {
        let now = Utc::now();
        assert_eq!(freshness_label(Some(now - ChronoDuration::hours(2)), now), "hot");
        assert_eq!(freshness_label(Some(now - ChronoDuration::hours(30)), now), "recent");
        assert_eq!(freshness_label(Some(now - ChronoDuration::days(5)), now), "older");
        assert_eq!(freshness_label(None, now), "unknown");
    }

    #[test]
    fn test_appendix_numbers_sources() {
        let sources = vec![
            SourceRef { title: "A".into(), url: "https://a.dev".into(), source: "Alpha".into() },
            SourceRef { title: "B".into(), url: "https://b.dev".into(), source: "Beta".into() },
        ];
        let appendix = sources_appendix(Domain::Ai, &sources);
        assert!(appendix.starts_with("SOURCES (AI):"));
        assert!(appendix.contains("1. Alpha - \"A\"\n   https://a.dev"));
        assert!(appendix.contains("2. Beta - \"B\""));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = GeminiClient::new(GenerationConfig::default());
        assert!(matches!(result, Err(CuratorError::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_selection_never_calls_service() {
        let mock = Arc::new(MockCompletion::new("unused"));
        let generator = PostGenerator::new(mock.clone());
        let result = generator.generate(Domain::Backend, &[]).await;
        assert!(matches!(result, Err(CuratorError::InsufficientSources { actual: 0, .. })));
        assert_eq!(mock.calls(), 0);
    }
}
