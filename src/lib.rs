//! Sumi-Spider: a focused, polite web crawler core
//!
//! This crate discovers, filters and schedules pages within a single site,
//! respecting robots.txt and crawl delays, resolving HTTP and meta-refresh
//! redirects, and stopping once navigation pages are exhausted or a budget
//! is reached.

pub mod config;
pub mod crawler;
pub mod robots;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Spider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    crawl_sites, focused_crawler, CrawlOutcome, CrawlPhase, CrawlSession, FetchResult, Fetcher,
    HttpFetcher, PageStep, Spider, StopSignal,
};
pub use robots::{parse_robots, RobotsBody, RobotsRules};
pub use store::{UrlState, UrlStore};
pub use url::{extract_origin, normalize_url, LanguageOracle, LocaleHeuristic, PathRules};
