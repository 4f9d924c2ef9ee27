//! Fetch scheduling: global concurrency and per-site politeness
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Spacing fetches to one site by its crawl delay
//! - Integrating robots.txt crawl delays with the configured default

use crate::config::CrawlerConfig;
use crate::store::UrlStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Gatekeeper for outgoing page fetches
///
/// The scheduler coordinates:
/// - Global concurrency limits (max concurrent fetches)
/// - Per-site rate limits (minimum time between requests)
///
/// Clones share the same semaphore.
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    /// Delay used when robots.txt sets none, in seconds
    default_delay: f64,
}

impl FetchScheduler {
    /// Creates a scheduler from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Self {
        Self::with_limits(config.max_concurrent_fetches as usize, config.default_crawl_delay)
    }

    /// Creates a scheduler with explicit limits
    ///
    /// A concurrency of zero is raised to one.
    pub fn with_limits(max_concurrent: usize, default_delay: f64) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            default_delay,
        }
    }

    /// Waits for a free fetch permit
    ///
    /// # Returns
    ///
    /// * `Some(permit)` - Hold it for the duration of the fetch
    /// * `None` - The semaphore was closed
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().acquire_owned().await.ok()
    }

    /// Number of fetches that could start right now
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Effective crawl delay for a site, in seconds
    pub fn crawl_delay(&self, store: &UrlStore, domain: &str) -> f64 {
        store.get_crawl_delay(domain, Some(self.default_delay))
    }

    /// Reserves the site's next politeness slot and sleeps until it starts
    ///
    /// # Returns
    ///
    /// The time spent waiting
    pub async fn wait_for_slot(&self, store: &UrlStore, domain: &str) -> Duration {
        let delay = self.crawl_delay(store, domain);
        let wait = store.reserve_fetch_slot(domain, delay);

        if !wait.is_zero() {
            tracing::debug!("Waiting {:?} before next request to {}", wait, domain);
            tokio::time::sleep(wait).await;
        }
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_delay_prefers_robots() {
        let store = UrlStore::new();
        store.add_urls(["https://example.org/"], false);
        let scheduler = FetchScheduler::with_limits(2, 1.5);

        assert_eq!(scheduler.crawl_delay(&store, "https://example.org"), 1.5);
        store.set_crawl_delay("https://example.org", Some(3.0));
        assert_eq!(scheduler.crawl_delay(&store, "https://example.org"), 3.0);
    }

    #[test]
    fn test_zero_concurrency_is_raised() {
        let scheduler = FetchScheduler::with_limits(0, 0.0);
        assert_eq!(scheduler.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_permits_are_bounded() {
        let scheduler = FetchScheduler::with_limits(2, 0.0);
        let first = scheduler.acquire().await.unwrap();
        let _second = scheduler.acquire().await.unwrap();
        assert_eq!(scheduler.available_permits(), 0);

        drop(first);
        assert_eq!(scheduler.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_first_slot_is_immediate() {
        let store = UrlStore::new();
        let scheduler = FetchScheduler::with_limits(1, 0.0);
        let waited = scheduler.wait_for_slot(&store, "https://example.org").await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_second_slot_waits_for_delay() {
        let store = UrlStore::new();
        let scheduler = FetchScheduler::with_limits(1, 0.2);

        scheduler.wait_for_slot(&store, "https://example.org").await;
        let waited = scheduler.wait_for_slot(&store, "https://example.org").await;
        assert!(waited > Duration::from_millis(100));

        // other sites are paced independently
        let other = scheduler.wait_for_slot(&store, "https://test.org").await;
        assert_eq!(other, Duration::ZERO);
    }
}
