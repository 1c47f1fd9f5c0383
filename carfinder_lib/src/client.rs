//! Retrying wrapper around the one-shot marketplace client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use carfinder_api::{Client, Format, Query, Region, SearchQuery, DEFAULT_TIMEOUT};

/// Why the last attempt of a fetch failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, TLS or body-read failure.
    Transport(String),
    Timeout,
    /// Non-2xx response.
    Status(u16),
    /// The request could not be built (proxy or URL rejected). Never retried.
    Rejected(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport(msg) => write!(f, "transport error: {}", msg),
            FailureKind::Timeout => write!(f, "timed out"),
            FailureKind::Status(code) => write!(f, "HTTP {}", code),
            FailureKind::Rejected(msg) => write!(f, "request rejected: {}", msg),
        }
    }
}

impl From<&carfinder_api::Error> for FailureKind {
    fn from(err: &carfinder_api::Error) -> Self {
        use carfinder_api::Error;
        match err {
            Error::RequestFailed(msg) => FailureKind::Transport(msg.clone()),
            Error::Timeout => FailureKind::Timeout,
            Error::HttpStatus { status, .. } => FailureKind::Status(*status),
            other => FailureKind::Rejected(other.to_string()),
        }
    }
}

/// A fetch that exhausted its attempts, or could not be attempted at all.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{region} {what} failed after {attempts} attempt(s): {kind}")]
pub struct FetchFailed {
    pub region: String,
    /// `"page"` or `"feed"`.
    pub what: &'static str,
    pub kind: FailureKind,
    pub attempts: usize,
}

impl FetchFailed {
    /// Rejected requests fail the same way in every region, so there is no
    /// point moving on to the next one.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, FailureKind::Rejected(_))
    }
}

/// Fetch retry settings.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: usize,
    /// Fixed pause between attempts.
    pub backoff: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(1000),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryConfig {
    /// Reads `CARFINDER_RETRY_MAX`, `CARFINDER_RETRY_BACKOFF_MS` and
    /// `CARFINDER_TIMEOUT_SECS`, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_usize("CARFINDER_RETRY_MAX", defaults.max_attempts).max(1),
            backoff: Duration::from_millis(env_u64(
                "CARFINDER_RETRY_BACKOFF_MS",
                defaults.backoff.as_millis() as u64,
            )),
            timeout: Duration::from_secs(env_u64(
                "CARFINDER_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Where the pagination driver gets its documents from.
#[async_trait]
pub trait PageSource {
    /// Fetches the HTML results page for `query`.
    async fn fetch_page(&self, region: &Region, query: &SearchQuery)
        -> Result<String, FetchFailed>;

    /// Fetches the feed representation of the same results.
    async fn fetch_feed(&self, region: &Region, query: &SearchQuery)
        -> Result<String, FetchFailed>;
}

/// Marketplace client with bounded retries and a fixed backoff.
pub struct RetryingClient {
    inner: Client,
    config: RetryConfig,
}

impl RetryingClient {
    pub fn new(config: RetryConfig, proxy: Option<&str>) -> Self {
        let inner = Client::new()
            .with_timeout(config.timeout)
            .with_proxy(proxy);
        Self { inner, config }
    }

    /// Settings from the environment and no proxy.
    pub fn from_env() -> Self {
        Self::new(RetryConfig::from_env(), None)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn fetch_page(
        &self,
        region: &Region,
        query: &SearchQuery,
    ) -> Result<String, FetchFailed> {
        let query = query.clone().with_format(Format::Html);
        self.with_retry(region, "page", &query).await
    }

    pub async fn fetch_feed(
        &self,
        region: &Region,
        query: &SearchQuery,
    ) -> Result<String, FetchFailed> {
        let query = query.clone().with_format(Format::Rss);
        self.with_retry(region, "feed", &query).await
    }

    async fn with_retry(
        &self,
        region: &Region,
        what: &'static str,
        query: &SearchQuery,
    ) -> Result<String, FetchFailed> {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match self.inner.fetch(region, query).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    let kind = FailureKind::from(&err);
                    if !err.is_transport() || attempt >= self.config.max_attempts {
                        return Err(FetchFailed {
                            region: region.name.clone(),
                            what,
                            kind,
                            attempts: attempt,
                        });
                    }
                    tracing::warn!(
                        "{} {} request failed (attempt {}/{}): {}, retrying in {:.1}s",
                        region.name,
                        what,
                        attempt,
                        self.config.max_attempts,
                        kind,
                        self.config.backoff.as_secs_f64()
                    );
                    tokio::time::sleep(self.config.backoff).await;
                }
            }
        }
    }
}

#[async_trait]
impl PageSource for RetryingClient {
    async fn fetch_page(
        &self,
        region: &Region,
        query: &SearchQuery,
    ) -> Result<String, FetchFailed> {
        RetryingClient::fetch_page(self, region, query).await
    }

    async fn fetch_feed(
        &self,
        region: &Region,
        query: &SearchQuery,
    ) -> Result<String, FetchFailed> {
        RetryingClient::fetch_feed(self, region, query).await
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_from_api_error() {
        assert_eq!(
            FailureKind::from(&carfinder_api::Error::Timeout),
            FailureKind::Timeout
        );
        assert_eq!(
            FailureKind::from(&carfinder_api::Error::HttpStatus {
                status: 403,
                body: String::new()
            }),
            FailureKind::Status(403)
        );
        assert!(matches!(
            FailureKind::from(&carfinder_api::Error::InvalidProxy("x".into())),
            FailureKind::Rejected(_)
        ));
    }

    #[test]
    fn fetch_failed_message() {
        let err = FetchFailed {
            region: "sfbay".into(),
            what: "page",
            kind: FailureKind::Status(503),
            attempts: 3,
        };
        assert_eq!(err.to_string(), "sfbay page failed after 3 attempt(s): HTTP 503");
        assert!(!err.is_fatal());
    }

    #[test]
    fn attempts_never_zero() {
        assert_eq!(RetryConfig::default().with_max_attempts(0).max_attempts, 1);
    }
}
