//! Configuration module for Sumi-Spider
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_spider::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Default crawl delay: {}s", config.crawler.default_crawl_delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HeuristicsConfig, UserAgentConfig, DEFAULT_CRAWL_DELAY,
    MAX_CRAWL_DELAY,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
