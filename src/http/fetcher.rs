//! Page fetcher with retry and rate limiting
//!
//! Executes one page request:
//! - Acquires a rate limit lease per attempt and releases it before
//!   deciding what to do with the outcome
//! - Retries transient failures with capped backoff and jitter
//! - Fails permanent failures immediately
//! - Decodes the body and extracts items and the next cursor

use super::rate_limit::{millis, RateLimiter};
use super::transport::{RawResponse, ReqwestTransport, Transport};
use crate::error::{Error, Result};
use crate::pagination::{extract_page, PageResult, PaginationConfig};
use crate::request::PageRequest;
use crate::types::BackoffType;
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const BODY_SNIPPET_LEN: usize = 512;

/// Retry and timeout settings for page fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Timeout per attempt
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    #[serde(rename = "initial_backoff_ms", with = "millis")]
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    #[serde(rename = "max_backoff_ms", with = "millis")]
    pub max_backoff: Duration,
    /// Type of backoff strategy
    #[serde(rename = "backoff")]
    pub backoff_type: BackoffType,
    /// Randomize each delay between half and the full value
    pub jitter: bool,
    /// Honor a numeric `Retry-After` on 429 responses
    pub respect_retry_after: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(30),
            backoff_type: BackoffType::Exponential,
            jitter: true,
            respect_retry_after: true,
        }
    }
}

impl FetcherConfig {
    /// Set the per-attempt timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Enable or disable jitter
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate the un-jittered backoff delay before retry number `attempt` (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }

    fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after.filter(|_| self.respect_retry_after) {
            return wait.min(self.max_backoff);
        }
        let delay = self.calculate_backoff(attempt);
        if self.jitter {
            jittered(delay)
        } else {
            delay
        }
    }
}

/// Equal jitter: half the delay plus a random share of the other half
#[allow(clippy::cast_possible_truncation)]
fn jittered(delay: Duration) -> Duration {
    let half = delay / 2;
    let spread = half.as_millis() as u64;
    if spread == 0 {
        return delay;
    }
    half + Duration::from_millis(rand::rng().random_range(0..=spread))
}

/// Executes page requests for every job of a run
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    config: FetcherConfig,
}

impl PageFetcher {
    /// Create a fetcher over a transport
    pub fn new(transport: Arc<dyn Transport>, limiter: RateLimiter, config: FetcherConfig) -> Self {
        Self {
            transport,
            limiter,
            config,
        }
    }

    /// Create a fetcher backed by reqwest
    pub fn with_reqwest(limiter: RateLimiter, config: FetcherConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?), limiter, config))
    }

    /// The shared rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Retry and timeout settings
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch one page and extract its items and next cursor
    pub async fn fetch(&self, request: &PageRequest, pagination: &PaginationConfig) -> Result<PageResult> {
        let response = self.execute(request).await?;

        let body: Value = serde_json::from_str(&response.body).map_err(|e| {
            Error::malformed(
                format!("response body is not valid JSON: {e}"),
                format!("text[{}]", response.body.len()),
            )
        })?;

        let page = extract_page(&body, &response.headers, request, pagination)?;
        debug!(
            url = %request.url,
            items = page.items.len(),
            more = !page.is_terminal(),
            "Fetched page"
        );
        Ok(page)
    }

    /// Send a request with leases, timeouts and retries; returns the first
    /// 2xx response
    pub async fn execute(&self, request: &PageRequest) -> Result<RawResponse> {
        let host = request.host()?;
        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut lease = self.limiter.acquire(&host).await?;
            let outcome = self.attempt(request).await;
            lease.release()?;

            let (error, retry_after) = match outcome {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let retry_after = (response.status == 429)
                        .then(|| parse_retry_after(&response.headers))
                        .flatten();
                    let error = Error::http_status(response.status, snippet(&response.body));
                    if !error.is_retryable() {
                        debug!(url = %request.url, status = response.status, "Permanent upstream failure");
                        return Err(Error::PermanentUpstream {
                            status: response.status,
                            body: snippet(&response.body),
                        });
                    }
                    (error, retry_after)
                }
                Err(e) if e.is_retryable() => (e, None),
                Err(e) => return Err(e),
            };

            if attempt >= max_attempts {
                return Err(Error::TransientUpstream {
                    attempts: attempt,
                    message: error.to_string(),
                });
            }

            let delay = self.config.delay_for(attempt - 1, retry_after);
            warn!(
                url = %request.url,
                attempt,
                max_attempts,
                delay = ?delay,
                error = %error,
                "Transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, request: &PageRequest) -> Result<RawResponse> {
        match tokio::time::timeout(self.config.timeout, self.transport.send(request)).await {
            Ok(result) => result,
            #[allow(clippy::cast_possible_truncation)]
            Err(_) => Err(Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }),
        }
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// Extract a numeric `Retry-After` value in seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_secs)
}

fn snippet(body: &str) -> String {
    match body.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
