//! Retrying HTTP transport for provider calls
//!
//! Requests are retried when the provider is unreachable, times out, answers
//! 5xx or throttles with 429. Throttled responses honour a delta-seconds
//! `Retry-After`; everything else backs off exponentially from a base delay.

use std::time::Duration;

use calsync_domain::constants::{DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS};
use calsync_domain::{CalSyncError, ProviderConfig, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Longest `Retry-After` the client is willing to honour.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(200);
/// Backoff stops doubling after this many retries.
const MAX_BACKOFF_DOUBLINGS: u32 = 8;

/// How many times to try a request and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first try included
    pub max_attempts: usize,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS, base_backoff: DEFAULT_BASE_BACKOFF }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    fn backoff(&self, retry: usize) -> Duration {
        let doublings = (retry.saturating_sub(1) as u32).min(MAX_BACKOFF_DOUBLINGS);
        self.base_backoff.saturating_mul(1 << doublings)
    }
}

/// What to do with the outcome of one attempt
enum Verdict {
    Done,
    RetryAfter(Option<Duration>),
}

impl Verdict {
    fn for_response(response: &Response) -> Self {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RetryAfter(retry_after(response))
        } else if status.is_server_error() {
            Self::RetryAfter(None)
        } else {
            Self::Done
        }
    }

    fn for_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::RetryAfter(None)
        } else {
            Self::Done
        }
    }
}

/// Provider HTTP client
///
/// The final response is returned whatever its status; mapping statuses to
/// domain errors is left to the caller.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Client tuned by the provider section of the configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .build()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send `builder`, retrying per the client's [`RetryPolicy`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    CalSyncError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(|err| CalSyncError::from(InfraError::from(err)))?;
            let url = request.url().clone();
            debug!(attempt, method = %request.method(), %url, "sending HTTP request");

            let outcome = self.client.execute(request).await;
            let verdict = match &outcome {
                Ok(response) => Verdict::for_response(response),
                Err(err) => Verdict::for_error(err),
            };

            match verdict {
                Verdict::RetryAfter(hint) if attempt < attempts => {
                    let delay = hint.unwrap_or_else(|| self.retry.backoff(attempt));
                    let reason = match &outcome {
                        Ok(response) => response.status().to_string(),
                        Err(err) => err.to_string(),
                    };
                    warn!(attempt, %url, %reason, ?delay, "retrying HTTP request");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                _ => {
                    return outcome.map_err(|err| InfraError::from(err).into());
                }
            }
        }
    }
}

/// `Retry-After` in delta-seconds form, capped.
fn retry_after(response: &Response) -> Option<Duration> {
    let seconds = response.headers().get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER))
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.retry.base_backoff = backoff;
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(concat!("calsync/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(|err| CalSyncError::from(InfraError::from(err)))?;

        Ok(HttpClient { client, retry: self.retry })
    }
}
