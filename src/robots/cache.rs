//! Robots.txt caching implementation
//!
//! Rules are kept together with the time they were fetched so that a store
//! reused across sessions refreshes them once they are a day old.

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};

/// How long fetched rules stay fresh
pub const ROBOTS_MAX_AGE_HOURS: i64 = 24;

/// Cached robots.txt rules for a site
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed rules
    pub rules: RobotsRules,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Wraps freshly fetched rules with the current timestamp
    pub fn new(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached rules are older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(ROBOTS_MAX_AGE_HOURS)
    }

    /// Returns the age of the cached rules
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}
