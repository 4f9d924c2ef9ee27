//! Per-crawl state carried between page steps

use crate::robots::RobotsRules;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of a focused crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlPhase {
    #[default]
    Uninitialized,
    /// Seeded; no page step taken yet
    Initialized,
    /// At least one page step taken
    Stepping,
    /// A stop condition was reached
    Terminated,
}

impl CrawlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlPhase::Uninitialized => "uninitialized",
            CrawlPhase::Initialized => "initialized",
            CrawlPhase::Stepping => "stepping",
            CrawlPhase::Terminated => "terminated",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one page step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageStep {
    /// The todo queue still holds a navigation page
    pub still_active: bool,
    /// Known URLs of the site after the step
    pub known_count: usize,
    /// Pages consumed so far, this step included
    pub visited_count: usize,
}

/// State of one focused crawl
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrawlSession {
    /// Origin of the resolved homepage
    pub base_url: String,

    /// Number of pages consumed so far
    pub iteration: usize,

    /// Known URLs of the site
    pub known_count: usize,

    /// The site's robots.txt rules; `None` means no policy
    pub rules: Option<RobotsRules>,

    /// The todo queue still holds a navigation page
    pub still_active: bool,

    pub phase: CrawlPhase,

    /// Target language, if the crawl is filtered
    pub lang: Option<String>,
}

impl CrawlSession {
    /// Returns true while the crawl should take another step
    ///
    /// A crawl continues while navigation pages remain, fewer than
    /// `max_seen_urls` pages were consumed and at most `max_known_urls`
    /// URLs are known.
    pub fn should_continue(&self, max_seen_urls: usize, max_known_urls: usize) -> bool {
        self.phase != CrawlPhase::Terminated
            && self.still_active
            && self.known_count <= max_known_urls
            && self.iteration < max_seen_urls
    }

    /// Folds a page step into the session
    pub fn apply(&mut self, step: PageStep) {
        self.still_active = step.still_active;
        self.known_count = step.known_count;
        self.iteration = step.visited_count;
        self.phase = CrawlPhase::Stepping;
    }

    /// Marks the crawl as done
    pub fn finish(&mut self) {
        self.phase = CrawlPhase::Terminated;
    }
}

/// Final state of a focused crawl
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrawlOutcome {
    /// URLs still pending, in discovery order
    pub todo: Vec<String>,
    /// All known URLs, in discovery order
    pub known: Vec<String>,
    /// Pages consumed
    pub visited_count: usize,
}

/// Cooperative cancellation flag shared between a crawl and its caller
///
/// Checked between page steps; fetches already in flight complete.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that crawls using this signal stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
