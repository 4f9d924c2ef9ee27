//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML parsing and link extraction
//! - Homepage redirect and meta-refresh resolution
//! - Request scheduling and politeness pacing
//! - Focused crawl coordination

mod coordinator;
mod fetcher;
mod links;
mod parser;
mod redirect;
mod scheduler;
mod session;

pub use coordinator::{crawl_sites, focused_crawler, Spider};
pub use fetcher::{build_http_client, FetchResult, Fetcher, HttpFetcher, PageBody};
pub use links::{is_still_navigation, process_links, Link, LinkProcessor, LinkReport};
pub use parser::{document_language, extract_links, parse_html, ParsedPage};
pub use redirect::{
    parse_refresh_content, probe_alternative_homepage, refresh_detection, HomepageProbe, Refresh,
};
pub use scheduler::FetchScheduler;
pub use session::{CrawlOutcome, CrawlPhase, CrawlSession, PageStep, StopSignal};
