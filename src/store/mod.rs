//! URL store: per-site bookkeeping of known, visited and pending URLs
//!
//! One store belongs to one crawl session (or one set of sessions that share
//! it on purpose). It performs no I/O. Sites are keyed by origin
//! (`scheme://host[:port]`); the site map is guarded by a `RwLock` and every
//! site record by its own `Mutex`, so mutations on one site are serialized
//! while different sites never contend.
//!
//! # Components
//!
//! - `UrlStore`: the shared store
//! - `DomainUrls`: the record kept for a single site
//! - `UrlState`: pending / visited / excluded

mod domain;
mod url_state;

pub use domain::DomainUrls;
pub use url_state::UrlState;

pub(crate) use domain::delay_from_secs;

use crate::config::DEFAULT_CRAWL_DELAY;
use crate::robots::{CachedRobots, RobotsRules};
use crate::url::{extract_origin, normalize_url, origin_of};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

type SharedDomain = Arc<Mutex<DomainUrls>>;

/// Normalized, deduplicated record of all URLs seen per site
///
/// # Examples
///
/// ```
/// use sumi_spider::UrlStore;
///
/// let store = UrlStore::new();
/// store.add_urls(["https://example.org/page1", "https://example.org/page1/"], false);
/// assert_eq!(store.find_known_urls("https://example.org").len(), 1);
/// assert_eq!(store.get_crawl_delay("https://example.org", None), 5.0);
/// ```
#[derive(Debug, Default)]
pub struct UrlStore {
    domains: RwLock<HashMap<String, SharedDomain>>,
}

impl UrlStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds URLs to the store
    ///
    /// URLs are normalized first; invalid ones are skipped. Unseen URLs become
    /// known, and pending unless `visited` is set. Already known URLs are left
    /// alone, except that `visited = true` promotes a pending URL to visited.
    ///
    /// # Returns
    ///
    /// The number of URLs that were not known before
    pub fn add_urls<I, S>(&self, urls: I, visited: bool) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = if visited {
            UrlState::Visited
        } else {
            UrlState::Pending
        };
        self.insert_grouped(urls.into_iter().map(|url| (url, state, false)), visited)
            .len()
    }

    /// Records URLs as known without ever queueing them
    ///
    /// # Returns
    ///
    /// The number of URLs that were not known before
    pub fn add_excluded<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_grouped(
            urls.into_iter().map(|url| (url, UrlState::Excluded, false)),
            false,
        )
        .len()
    }

    /// Records URLs, each with its own initial state, keeping their order
    ///
    /// Known URLs are left alone.
    ///
    /// # Returns
    ///
    /// The newly known URLs (normalized) with the state they were given
    pub fn add_entries<I, S>(&self, entries: I) -> Vec<(String, UrlState)>
    where
        I: IntoIterator<Item = (S, UrlState)>,
        S: AsRef<str>,
    {
        self.insert_grouped(
            entries.into_iter().map(|(url, state)| (url, state, false)),
            false,
        )
    }

    /// Records URLs like [`add_entries`](Self::add_entries), queueing the
    /// new pending ones flagged `true` ahead of everything already waiting
    ///
    /// Prioritized URLs keep their relative order at the front of the todo
    /// list; the others are queued last.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_spider::{UrlState, UrlStore};
    ///
    /// let store = UrlStore::new();
    /// store.add_urls(["https://example.org/page1"], false);
    /// store.add_prioritized([
    ///     ("https://example.org/tag/1", UrlState::Pending, true),
    ///     ("https://example.org/page2", UrlState::Pending, false),
    /// ]);
    /// assert_eq!(
    ///     store.find_unvisited_urls("https://example.org"),
    ///     vec![
    ///         "https://example.org/tag/1",
    ///         "https://example.org/page1",
    ///         "https://example.org/page2",
    ///     ]
    /// );
    /// ```
    pub fn add_prioritized<I, S>(&self, entries: I) -> Vec<(String, UrlState)>
    where
        I: IntoIterator<Item = (S, UrlState, bool)>,
        S: AsRef<str>,
    {
        self.insert_grouped(entries, false)
    }

    /// Pending URLs of a site in todo order
    ///
    /// `domain` may be the origin or any URL of the site. Unknown sites yield
    /// an empty list.
    pub fn find_unvisited_urls(&self, domain: &str) -> Vec<String> {
        self.with_domain(domain, |record| record.pending_urls())
            .unwrap_or_default()
    }

    /// All known URLs of a site in discovery order
    pub fn find_known_urls(&self, domain: &str) -> Vec<String> {
        self.with_domain(domain, |record| record.known_urls())
            .unwrap_or_default()
    }

    /// Crawl delay for a site, in seconds
    ///
    /// Returns the delay recorded from robots.txt, else `default`, else the
    /// fixed default of 5 seconds.
    pub fn get_crawl_delay(&self, domain: &str, default: Option<f64>) -> f64 {
        self.with_domain(domain, |record| record.crawl_delay)
            .flatten()
            .or(default)
            .unwrap_or(DEFAULT_CRAWL_DELAY)
    }

    /// Overrides the crawl delay recorded for a site
    pub fn set_crawl_delay(&self, domain: &str, delay: Option<f64>) {
        if let Some(record) = self.domain_for(domain, true) {
            lock(&record).crawl_delay = delay;
        }
    }

    /// Takes the first pending URL of a site and marks it visited
    pub fn next_unvisited(&self, domain: &str) -> Option<String> {
        self.with_domain(domain, |record| record.pop_pending())
            .flatten()
    }

    /// Takes the first pending URL of a site, checking it with `allowed`
    ///
    /// Accepted URLs are marked visited, rejected ones excluded; both are
    /// returned with their new state. The check runs under the site lock.
    pub fn next_unvisited_checked(
        &self,
        domain: &str,
        allowed: impl FnOnce(&str) -> bool,
    ) -> Option<(String, UrlState)> {
        self.with_domain(domain, |record| record.pop_pending_with(allowed))
            .flatten()
    }

    /// Takes up to `n` pending URLs of a site, marking each visited
    pub fn take_unvisited(&self, domain: &str, n: usize) -> Vec<String> {
        self.with_domain(domain, |record| {
            std::iter::from_fn(|| record.pop_pending()).take(n).collect()
        })
        .unwrap_or_default()
    }

    /// Marks a URL as visited, recording it if it was unknown
    ///
    /// Returns false for invalid URLs and URLs that were already visited or
    /// excluded.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.transition(url, UrlState::Visited)
    }

    /// Marks a URL as excluded, recording it if it was unknown
    pub fn mark_excluded(&self, url: &str) -> bool {
        self.transition(url, UrlState::Excluded)
    }

    /// Returns true if the (normalized) URL is known
    pub fn is_known(&self, url: &str) -> bool {
        self.url_state(url).is_some()
    }

    /// Returns the state of a URL, if known
    pub fn url_state(&self, url: &str) -> Option<UrlState> {
        let normalized = normalize_url(url).ok()?;
        self.with_domain(normalized.as_str(), |record| record.state(normalized.as_str()))
            .flatten()
    }

    /// Number of known URLs for a site
    pub fn known_count(&self, domain: &str) -> usize {
        self.with_domain(domain, |record| record.known_count())
            .unwrap_or(0)
    }

    /// Number of visited URLs for a site
    pub fn visited_count(&self, domain: &str) -> usize {
        self.with_domain(domain, |record| record.visited_count())
            .unwrap_or(0)
    }

    /// Number of pending URLs for a site
    pub fn pending_count(&self, domain: &str) -> usize {
        self.with_domain(domain, |record| record.pending_count())
            .unwrap_or(0)
    }

    /// Number of sites the store knows about
    pub fn domain_count(&self) -> usize {
        self.domains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing was ever recorded
    pub fn is_empty(&self) -> bool {
        self.domain_count() == 0
    }

    /// Caches robots.txt rules for a site and records their crawl delay
    ///
    /// # Arguments
    ///
    /// * `domain` - The site's origin or any of its URLs
    /// * `rules` - The freshly fetched rules
    /// * `user_agent` - The agent whose `Crawl-delay` applies
    pub fn store_rules(&self, domain: &str, rules: RobotsRules, user_agent: &str) {
        let Some(record) = self.domain_for(domain, true) else {
            tracing::debug!("Not storing robots.txt rules for invalid domain {}", domain);
            return;
        };
        let mut record = lock(&record);
        record.crawl_delay = rules.crawl_delay(user_agent);
        record.robots = Some(CachedRobots::new(rules));
    }

    /// Previously fetched robots.txt rules for a site
    pub fn get_rules(&self, domain: &str) -> Option<RobotsRules> {
        self.with_domain(domain, |record| {
            record.robots.as_ref().map(|cached| cached.rules.clone())
        })
        .flatten()
    }

    /// Returns true if cached rules exist and are less than a day old
    pub fn has_fresh_rules(&self, domain: &str) -> bool {
        self.with_domain(domain, |record| {
            record.robots.as_ref().is_some_and(|cached| !cached.is_stale())
        })
        .unwrap_or(false)
    }

    /// Reserves the next politeness slot for a site
    ///
    /// Successive reservations for the same site are spaced by at least
    /// `delay` seconds; different sites are independent.
    ///
    /// # Returns
    ///
    /// How long the caller must sleep before fetching
    pub fn reserve_fetch_slot(&self, domain: &str, delay: f64) -> Duration {
        match self.domain_for(domain, true) {
            Some(record) => {
                lock(&record).reserve_fetch_slot(delay_from_secs(delay), Instant::now())
            }
            None => Duration::ZERO,
        }
    }

    fn insert_grouped<I, S>(&self, entries: I, promote: bool) -> Vec<(String, UrlState)>
    where
        I: IntoIterator<Item = (S, UrlState, bool)>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for (key, batch) in group_by_domain(entries) {
            let domain = self.get_or_create(&key);
            added.extend(lock(&domain).insert_batch(batch, promote));
        }
        added
    }

    fn transition(&self, url: &str, state: UrlState) -> bool {
        let Ok(normalized) = normalize_url(url) else {
            tracing::debug!("Ignoring invalid URL {}", url);
            return false;
        };
        match self.domain_for(normalized.as_str(), true) {
            Some(record) => lock(&record).transition(normalized.as_str(), state),
            None => false,
        }
    }

    /// Runs `f` on an existing site record
    fn with_domain<T>(&self, domain: &str, f: impl FnOnce(&mut DomainUrls) -> T) -> Option<T> {
        let record = self.domain_for(domain, false)?;
        let mut guard = lock(&record);
        Some(f(&mut guard))
    }

    /// Looks up the record for a site, optionally creating it
    fn domain_for(&self, domain: &str, create: bool) -> Option<SharedDomain> {
        let key = extract_origin(domain)?;
        if create {
            return Some(self.get_or_create(&key));
        }
        self.domains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn get_or_create(&self, key: &str) -> SharedDomain {
        if let Some(existing) = self
            .domains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return existing.clone();
        }

        self.domains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

fn lock(record: &Mutex<DomainUrls>) -> MutexGuard<'_, DomainUrls> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Normalizes URLs and groups them by origin, keeping their relative order
fn group_by_domain<I, S>(entries: I) -> Vec<(String, Vec<(String, UrlState, bool)>)>
where
    I: IntoIterator<Item = (S, UrlState, bool)>,
    S: AsRef<str>,
{
    let mut groups: Vec<(String, Vec<(String, UrlState, bool)>)> = Vec::new();

    for (url, state, front) in entries {
        let url = url.as_ref();
        let normalized = match normalize_url(url) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::debug!("Skipping URL {}: {}", url, e);
                continue;
            }
        };
        let Some(key) = origin_of(&normalized) else {
            continue;
        };

        let entry = (normalized.to_string(), state, front);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, batch)) => batch.push(entry),
            None => groups.push((key, vec![entry])),
        }
    }

    groups
}
