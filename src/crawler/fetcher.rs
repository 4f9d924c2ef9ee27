//! HTTP fetcher implementation
//!
//! This module defines the `Fetcher` seam the crawler talks to, and its
//! reqwest-backed implementation:
//! - Building HTTP clients with proper user agent strings
//! - Following redirects up to a configured limit
//! - Reporting the post-redirect URL separately from the requested one
//! - Error classification

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Body of a fetched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBody {
    /// Decoded text (HTML, plain text, XML)
    Text(String),
    /// Anything that was not decoded as text
    Binary(Vec<u8>),
}

impl PageBody {
    /// Returns the text, if this is a text body
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PageBody::Text(text) => Some(text.as_str()),
            PageBody::Binary(_) => None,
        }
    }

    /// Consumes the body, returning non-blank text only
    pub fn into_text(self) -> Option<String> {
        match self {
            PageBody::Text(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// Successfully fetched the document
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Document body
        body: PageBody,
    },

    /// The server answered with a non-success status
    HttpError {
        /// Final URL after redirects
        final_url: String,
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (invalid URL, connection refused, timeout, redirect loop)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Returns true for a successful fetch
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// Final URL after redirects, if the server answered at all
    pub fn final_url(&self) -> Option<&str> {
        match self {
            FetchResult::Success { final_url, .. } | FetchResult::HttpError { final_url, .. } => {
                Some(final_url.as_str())
            }
            FetchResult::NetworkError { .. } => None,
        }
    }
}

/// Anything able to retrieve a document by URL
///
/// Implementations follow HTTP redirects themselves and report the final URL
/// so that callers can detect redirection. Failures are values, never panics.
pub trait Fetcher: Send + Sync {
    /// Fetches a URL
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResult> + Send;
}

impl<F: Fetcher> Fetcher for Arc<F> {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResult> + Send {
        (**self).fetch(url)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Timeouts and redirect limit
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_spider::config::Config;
/// use sumi_spider::crawler::build_http_client;
///
/// let config = Config::default();
/// let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(crawler.request_timeout);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(crawler.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher from the crawler configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::from_client(build_http_client(
            &config.user_agent,
            &config.crawler,
        )?))
    }

    /// Wraps an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    /// Fetches a URL with GET, following redirects
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx, textual Content-Type | Success with `PageBody::Text` |
    /// | 2xx, other Content-Type | Success with `PageBody::Binary` |
    /// | Any other status | HttpError |
    /// | Invalid URL, timeout, connection failure, too many redirects | NetworkError |
    async fn fetch(&self, url: &str) -> FetchResult {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return network_error(url, e),
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            tracing::debug!("HTTP {} for {}", status.as_u16(), url);
            return FetchResult::HttpError {
                final_url,
                status_code: status.as_u16(),
            };
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let body = if is_textual(&content_type) {
            response.text().await.map(PageBody::Text)
        } else {
            response.bytes().await.map(|b| PageBody::Binary(b.to_vec()))
        };

        match body {
            Ok(body) => FetchResult::Success {
                final_url,
                status_code: status.as_u16(),
                body,
            },
            Err(e) => network_error(url, e),
        }
    }
}

/// Returns true if a Content-Type should be decoded as text
///
/// A missing Content-Type is treated as text.
fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.contains("html")
        || content_type.contains("xml")
}

fn network_error(url: &str, e: reqwest::Error) -> FetchResult {
    let error = if e.is_builder() {
        format!("Invalid URL: {}", e)
    } else if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    };
    tracing::debug!("Fetching {} failed: {}", url, error);
    FetchResult::NetworkError { error }
}
