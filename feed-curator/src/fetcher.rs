use crate::types::{CuratorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// A successfully retrieved document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub response_time_ms: u64,
}

/// HTTP client shared by feed sources and the enricher: per-request timeout,
/// bounded retries with exponential backoff and a per-host request spacing.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        let initial = Duration::from_millis(self.config.retry_delay_millis);
        ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            max_interval: initial * 16,
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_seconds * (self.config.max_retries as u64 + 1))),
            ..Default::default()
        }
    }

    /// GET `url` and return its body. Network failures, 429 and 5xx answers
    /// are retried up to `max_retries` times; other non-success statuses fail at once.
    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        let start_time = Instant::now();
        let mut backoff = self.backoff();
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            self.wait_for_host(url).await?;

            let error = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        if let Some(length) = response.content_length() {
                            let size_mb = length as usize / (1024 * 1024);
                            if size_mb > self.config.max_body_size_mb {
                                return Err(CuratorError::BodyTooLarge { size_mb });
                            }
                        }
                        let body = response.text().await?;
                        let response_time_ms = start_time.elapsed().as_millis() as u64;
                        info!("Fetched {} ({} bytes, {} ms)", url, body.len(), response_time_ms);
                        return Ok(FetchedDocument {
                            url: url.to_string(),
                            status: status.as_u16(),
                            body,
                            response_time_ms,
                        });
                    }

                    let error = CuratorError::General(format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    ));
                    if !is_retryable(status) {
                        return Err(error);
                    }
                    error
                }
                Err(e) => CuratorError::Http(e),
            };

            last_error = Some(error);
            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        warn!("Giving up on {} after {} attempts", url, self.config.max_retries + 1);
        Err(last_error.unwrap_or_else(|| CuratorError::General(format!("fetch failed: {}", url))))
    }

    /// Reserves the next request slot for the URL's host and sleeps until it
    /// opens. The lock is released before sleeping so other hosts proceed.
    async fn wait_for_host(&self, url: &str) -> Result<()> {
        let host = Url::parse(url)?.host_str().unwrap_or_default().to_string();
        let spacing = Duration::from_millis(self.config.min_host_interval_millis);

        let wait = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots.get(&host).copied().filter(|slot| *slot > now).unwrap_or(now);
            slots.insert(host.clone(), slot + spacing);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT
}
