use serde::Deserialize;

/// Fallback delay between two fetches to the same domain, in seconds
pub const DEFAULT_CRAWL_DELAY: f64 = 5.0;

/// Longest delay between two fetches to the same domain, in seconds
///
/// Larger robots.txt `Crawl-delay` values are clamped to this.
pub const MAX_CRAWL_DELAY: f64 = 120.0;

/// Main configuration structure for Sumi-Spider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub heuristics: HeuristicsConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched by one focused crawl
    #[serde(rename = "max-seen-urls", default = "default_max_seen_urls")]
    pub max_seen_urls: usize,

    /// Stop once more URLs than this are known for the site
    #[serde(rename = "max-known-urls", default = "default_max_known_urls")]
    pub max_known_urls: usize,

    /// Delay between requests to the same domain when robots.txt has none (seconds)
    #[serde(rename = "default-crawl-delay", default = "default_crawl_delay")]
    pub default_crawl_delay: f64,

    /// Maximum number of concurrent page fetches
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Maximum number of HTTP redirects followed per fetch
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the product token matched against robots.txt groups
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Path pattern lists used to classify links
///
/// Patterns are regular expressions matched against the full normalized URL,
/// evaluated in order.
#[derive(Debug, Clone, Deserialize)]
pub struct HeuristicsConfig {
    /// Patterns marking listing pages (tags, categories, pagination)
    #[serde(rename = "navigation-patterns", default = "default_navigation_patterns")]
    pub navigation_patterns: Vec<String>,

    /// Patterns marking pages that are recorded but never fetched
    #[serde(
        rename = "not-crawlable-patterns",
        default = "default_not_crawlable_patterns"
    )]
    pub not_crawlable_patterns: Vec<String>,
}

impl UserAgentConfig {
    /// Full User-Agent header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_seen_urls: default_max_seen_urls(),
            max_known_urls: default_max_known_urls(),
            default_crawl_delay: default_crawl_delay(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout: default_request_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiSpider".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sumi-spider".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            navigation_patterns: default_navigation_patterns(),
            not_crawlable_patterns: default_not_crawlable_patterns(),
        }
    }
}

fn default_max_seen_urls() -> usize {
    10
}

fn default_max_known_urls() -> usize {
    100_000
}

fn default_crawl_delay() -> f64 {
    DEFAULT_CRAWL_DELAY
}

fn default_max_concurrent_fetches() -> u32 {
    4
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_navigation_patterns() -> Vec<String> {
    vec![
        // taxonomy and archive listings: /tag/x, /category/x, /author/x, /archives/2020
        r"(?i)/(archives?|auth?or|autor|cat|categor(y|ies)|categorie|categoria|kategorien?|labels?|tags?|thema|themen|topics?)(/|$|[?#])".to_string(),
        // path pagination: /page/2, /seite/3
        r"(?i)/(page|paged|seite|pages)/\d+".to_string(),
        // query pagination: ?page=2, &p=3
        r"(?i)[?&](p|page|paged|pg)=\d+".to_string(),
    ]
}

fn default_not_crawlable_patterns() -> Vec<String> {
    vec![
        // account and back-office pages
        r"(?i)/(login|log-in|logout|signin|sign-in|signup|sign-up|register|account|admin|wp-admin|wp-login\.php|cart|checkout)(/|$|[?#.])".to_string(),
        // machine endpoints and feeds
        r"(?i)/(feed|rss|atom|wp-json|xmlrpc\.php|cgi-bin)(/|$|[?#])".to_string(),
        r"(?i)[?&](replytocom|share|print)=".to_string(),
        // non-HTML documents and media
        r"(?i)\.(jpe?g|png|gif|svg|webp|ico|bmp|mp3|mp4|avi|mov|webm|pdf|zip|gz|tar|rar|exe|dmg|docx?|xlsx?|pptx?|css|js|xml)$".to_string(),
    ]
}
