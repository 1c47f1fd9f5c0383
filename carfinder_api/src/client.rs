//! HTTP client for the marketplace search endpoints.

use std::time::Duration;

use url::Url;

use crate::{
    query::{Format, Query, SearchQuery},
    regions::Region,
    user_agent::get_user_agent,
    Error,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP client for one-shot search page and feed requests.
///
/// Each request builds a fresh `reqwest::Client` with a randomly chosen
/// user agent, so no client identity carries over between requests.
/// Retrying is left to the caller.
#[derive(Clone, Debug)]
pub struct Client {
    timeout: Duration,
    /// Outbound proxy applied to every scheme, if configured.
    proxy: Option<String>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client with the default timeout and no proxy.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Routes requests through `proxy`. Blank values are ignored.
    pub fn with_proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        self
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Builds the full request URL for `query` within `region`.
    pub fn search_url(&self, region: &Region, query: &SearchQuery) -> Result<Url, Error> {
        let url = region.base_url.join(&query.path()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidUrl(e.to_string())
        })?;
        Ok(query.add_to_url(&url))
    }

    fn build_http(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(self.timeout);
        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                tracing::error!("Rejected proxy {}: {}", proxy, e);
                Error::InvalidProxy(proxy.clone())
            })?;
            builder = builder.proxy(proxy);
        }
        builder.build().map_err(|e| {
            tracing::error!("Failed to build HTTP client: {}", e);
            Error::RequestFailed(e.to_string())
        })
    }

    /// Sends one GET for the search results (HTML or feed, per the query's
    /// format) and returns the response body.
    pub async fn fetch(&self, region: &Region, query: &SearchQuery) -> Result<String, Error> {
        let url = self.search_url(region, query)?;
        let http = self.build_http()?;
        let accept = match query.common().format {
            Format::Html => "text/html,application/xhtml+xml",
            Format::Rss => "application/rss+xml,application/xml;q=0.9,*/*;q=0.8",
        };
        tracing::debug!("GET {}", url);
        let resp = http
            .get(url)
            .header("accept", accept)
            .header("accept-language", "en-US,en;q=0.9")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        let body = resp.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::debug!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        Ok(body)
    }
}

fn map_transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::RequestFailed(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
