//! Robots.txt parser implementation
//!
//! This module turns a robots.txt body into a reusable rule object, using the
//! robotstxt crate for allow/disallow matching and a small group-aware scanner
//! for the `Crawl-delay` extension.

use crate::config::MAX_CRAWL_DELAY;
use robotstxt::DefaultMatcher;

/// Raw robots.txt body as handed over by the robots source
///
/// The body is either missing, decoded text, or bytes that were never
/// decoded (binary payloads, unknown encodings). Only `Text` can yield rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsBody {
    /// No body at all (network failure, non-2xx response)
    Absent,
    /// Decoded text
    Text(String),
    /// Undecoded bytes
    Bytes(Vec<u8>),
}

impl From<Option<String>> for RobotsBody {
    fn from(body: Option<String>) -> Self {
        match body {
            Some(text) => RobotsBody::Text(text),
            None => RobotsBody::Absent,
        }
    }
}

impl From<&str> for RobotsBody {
    fn from(text: &str) -> Self {
        RobotsBody::Text(text.to_string())
    }
}

/// Parsed robots.txt policy for one site
///
/// Immutable once built. Missing policy is modelled as `Option<RobotsRules>`
/// being `None`, which callers treat as "allow everything".
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsRules {
    /// Where the policy was read from
    url: String,
    /// Raw robots.txt content
    content: String,
}

impl RobotsRules {
    /// Creates rules from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `url` - The robots.txt URL the content came from
    /// * `content` - The raw robots.txt file content
    pub fn from_content(url: &str, content: &str) -> Self {
        Self {
            url: url.to_string(),
            content: content.to_string(),
        }
    }

    /// Returns the robots.txt URL these rules were read from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if `url` may be fetched by `user_agent`
    ///
    /// Uses Google's matching semantics: the most specific rule wins, the
    /// agent's own group takes precedence over `*`, and anything not covered
    /// is allowed.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - The crawler's product token (e.g. `SumiSpider`) or `*`
    /// * `url` - An absolute URL or a bare path (e.g. "/page.html")
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn can_fetch(&self, user_agent: &str, url: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// The delay of the agent's own group is preferred over the `*` group.
    /// A group applies when its `User-agent` value equals the product token
    /// of `user_agent` (`SumiSpider` in `SumiSpider/1.0`), ignoring case.
    /// A `User-agent` line that follows rule lines opens a new group.
    ///
    /// Delays above [`MAX_CRAWL_DELAY`] are clamped to it.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no applicable crawl delay is specified
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let product = product_token(user_agent);

        let mut group_agents: Vec<String> = Vec::new();
        let mut group_has_rules = false;
        let mut crawl_delay_for_wildcard: Option<f64> = None;
        let mut crawl_delay_for_agent: Option<f64> = None;

        for line in self.content.lines() {
            // Strip trailing comments
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if group_has_rules {
                        group_agents.clear();
                        group_has_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_has_rules = true;
                    let Some(delay) = value.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
                    else {
                        tracing::debug!("Ignoring invalid crawl-delay value '{}'", value);
                        continue;
                    };
                    if delay > MAX_CRAWL_DELAY {
                        tracing::debug!(
                            "Clamping crawl-delay {} to {} seconds",
                            value,
                            MAX_CRAWL_DELAY
                        );
                    }
                    let delay = delay.min(MAX_CRAWL_DELAY);

                    for agent in &group_agents {
                        if agent == "*" {
                            crawl_delay_for_wildcard.get_or_insert(delay);
                        } else if !product.is_empty() && product_token(agent) == product {
                            crawl_delay_for_agent.get_or_insert(delay);
                        }
                    }
                }
                _ => {
                    // Allow, Disallow and unknown directives close the agent list
                    group_has_rules = true;
                }
            }
        }

        crawl_delay_for_agent.or(crawl_delay_for_wildcard)
    }
}

/// Lowercased product token of a user agent, up to the first `/` or space
fn product_token(user_agent: &str) -> String {
    user_agent
        .trim()
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Parses a robots.txt body into rules
///
/// Missing bodies, undecoded bytes, blank text and text containing NUL or
/// other control characters yield `None`. This is never an error and never
/// "deny all": the caller simply has no policy and fails open.
///
/// # Examples
///
/// ```
/// use sumi_spider::robots::{parse_robots, RobotsBody};
///
/// let url = "https://example.org/robots.txt";
/// assert!(parse_robots(url, RobotsBody::Absent).is_none());
/// assert!(parse_robots(url, RobotsBody::Bytes(b"123".to_vec())).is_none());
///
/// let rules = parse_robots(url, "User-agent: *\nDisallow: /".into()).unwrap();
/// assert!(!rules.can_fetch("*", "https://example.org/1"));
/// ```
pub fn parse_robots(robots_url: &str, body: RobotsBody) -> Option<RobotsRules> {
    let text = match body {
        RobotsBody::Absent => {
            tracing::debug!("No robots.txt body for {}", robots_url);
            return None;
        }
        RobotsBody::Bytes(bytes) => {
            tracing::debug!(
                "Ignoring undecoded robots.txt body for {} ({} bytes)",
                robots_url,
                bytes.len()
            );
            return None;
        }
        RobotsBody::Text(text) => text,
    };

    if text.trim().is_empty() {
        tracing::debug!("Empty robots.txt at {}", robots_url);
        return None;
    }

    if text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        tracing::warn!("Unreadable robots.txt at {}, ignoring it", robots_url);
        return None;
    }

    Some(RobotsRules::from_content(robots_url, &text))
}
