//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! A site without a readable policy is crawled as if everything were allowed.

mod cache;
mod parser;

pub use cache::{CachedRobots, ROBOTS_MAX_AGE_HOURS};
pub use parser::{parse_robots, RobotsBody, RobotsRules};

use crate::crawler::{FetchResult, Fetcher, PageBody};
use crate::url::extract_origin;

impl From<PageBody> for RobotsBody {
    fn from(body: PageBody) -> Self {
        match body {
            PageBody::Text(text) => RobotsBody::Text(text),
            PageBody::Binary(bytes) => RobotsBody::Bytes(bytes),
        }
    }
}

/// Builds the robots.txt URL for the site a URL belongs to
///
/// # Examples
///
/// ```
/// use sumi_spider::robots::robots_url;
///
/// assert_eq!(
///     robots_url("https://example.org/blog/post"),
///     Some("https://example.org/robots.txt".to_string())
/// );
/// ```
pub fn robots_url(base_url: &str) -> Option<String> {
    extract_origin(base_url).map(|origin| format!("{}/robots.txt", origin))
}

/// Fetches and parses robots.txt for a site
///
/// # Arguments
///
/// * `fetcher` - The fetcher used for the request
/// * `base_url` - Any URL of the site (usually its origin)
///
/// # Returns
///
/// * `Some(RobotsRules)` - A readable policy was found
/// * `None` - No usable policy (invalid base URL, HTTP error, network
///   failure or unreadable body); callers fail open
pub async fn fetch_robots<F: Fetcher>(fetcher: &F, base_url: &str) -> Option<RobotsRules> {
    let url = robots_url(base_url)?;

    let body = match fetcher.fetch(&url).await {
        FetchResult::Success { body, .. } => RobotsBody::from(body),
        FetchResult::HttpError { status_code, .. } => {
            tracing::debug!("No robots.txt at {} (HTTP {})", url, status_code);
            RobotsBody::Absent
        }
        FetchResult::NetworkError { error } => {
            tracing::info!("Could not fetch {}: {}", url, error);
            RobotsBody::Absent
        }
    };

    parse_robots(&url, body)
}

/// Checks if a URL is allowed, treating a missing policy as "allow"
///
/// # Arguments
///
/// * `rules` - The site's rules, if any
/// * `user_agent` - The crawler's product token
/// * `url` - The URL to check
pub fn is_allowed(rules: Option<&RobotsRules>, user_agent: &str, url: &str) -> bool {
    rules.map_or(true, |r| r.can_fetch(user_agent, url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_url() {
        assert_eq!(
            robots_url("http://127.0.0.1:8080/some/page?x=1"),
            Some("http://127.0.0.1:8080/robots.txt".to_string())
        );
        assert_eq!(robots_url("1234"), None);
    }

    #[test]
    fn test_missing_policy_allows() {
        assert!(is_allowed(None, "TestBot", "https://example.org/private"));

        let rules = RobotsRules::from_content(
            "https://example.org/robots.txt",
            "User-agent: *\nDisallow: /private",
        );
        assert!(!is_allowed(Some(&rules), "TestBot", "https://example.org/private"));
        assert!(is_allowed(Some(&rules), "TestBot", "https://example.org/public"));
    }

    #[test]
    fn test_page_body_conversion() {
        assert_eq!(
            RobotsBody::from(PageBody::Text("User-agent: *".to_string())),
            RobotsBody::Text("User-agent: *".to_string())
        );
        assert_eq!(
            RobotsBody::from(PageBody::Binary(vec![1, 2])),
            RobotsBody::Bytes(vec![1, 2])
        );
    }
}
