use crate::config::MAX_CRAWL_DELAY;
use crate::robots::CachedRobots;
use crate::store::UrlState;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Everything the store knows about one site
///
/// Known URLs are kept in discovery order. Pending URLs also sit in a todo
/// queue, which is usually that same order; URLs queued with priority go to
/// its front. Entries that left `Pending` since they were queued are skipped
/// when popping.
#[derive(Debug, Clone, Default)]
pub struct DomainUrls {
    /// Known URLs in discovery order
    order: Vec<String>,

    /// State of every known URL
    states: HashMap<String, UrlState>,

    /// Todo queue
    queue: VecDeque<String>,

    pending: usize,
    visited: usize,

    /// Crawl delay from robots.txt, in seconds
    pub crawl_delay: Option<f64>,

    /// Cached robots.txt rules for this site
    pub robots: Option<CachedRobots>,

    /// Earliest instant the next fetch to this site may start
    next_fetch_at: Option<Instant>,
}

impl DomainUrls {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of a URL, if known
    pub fn state(&self, url: &str) -> Option<UrlState> {
        self.states.get(url).copied()
    }

    /// Records a URL the first time it is seen, queueing it last if pending
    ///
    /// Returns true if the URL was new. Known URLs keep their state.
    pub fn insert(&mut self, url: String, state: UrlState) -> bool {
        if !self.record(&url, state) {
            return false;
        }
        if state.is_pending() {
            self.queue.push_back(url);
        }
        true
    }

    /// Records a batch of URLs
    ///
    /// New pending URLs flagged `front` are queued before everything already
    /// waiting, keeping their batch order; the others are queued last. With
    /// `promote`, known pending URLs of the batch are marked visited.
    ///
    /// # Returns
    ///
    /// The new URLs with the state they were given
    pub fn insert_batch(
        &mut self,
        batch: Vec<(String, UrlState, bool)>,
        promote: bool,
    ) -> Vec<(String, UrlState)> {
        let mut added = Vec::new();
        let mut front = Vec::new();

        for (url, state, to_front) in batch {
            if !self.record(&url, state) {
                if promote {
                    self.transition(&url, UrlState::Visited);
                }
                continue;
            }
            if state.is_pending() {
                if to_front {
                    front.push(url.clone());
                } else {
                    self.queue.push_back(url.clone());
                }
            }
            added.push((url, state));
        }

        for url in front.into_iter().rev() {
            self.queue.push_front(url);
        }
        added
    }

    /// Moves a URL to a new state, recording it first if unknown
    ///
    /// A URL can only leave `Pending`; requests to move a visited or excluded
    /// URL elsewhere are ignored. Returns true if anything changed.
    pub fn transition(&mut self, url: &str, state: UrlState) -> bool {
        match self.states.get(url).copied() {
            None => self.insert(url.to_string(), state),
            Some(UrlState::Pending) if state != UrlState::Pending => {
                self.count(UrlState::Pending, false);
                self.count(state, true);
                self.states.insert(url.to_string(), state);
                true
            }
            Some(_) => false,
        }
    }

    /// Takes the first pending URL and marks it visited
    pub fn pop_pending(&mut self) -> Option<String> {
        self.pop_pending_with(|_| true).map(|(url, _)| url)
    }

    /// Takes the first pending URL, marking it visited if `allowed` accepts
    /// it and excluded otherwise
    pub fn pop_pending_with(
        &mut self,
        allowed: impl FnOnce(&str) -> bool,
    ) -> Option<(String, UrlState)> {
        while let Some(url) = self.queue.pop_front() {
            if self.states.get(&url).is_some_and(UrlState::is_pending) {
                let state = if allowed(&url) {
                    UrlState::Visited
                } else {
                    UrlState::Excluded
                };
                self.transition(&url, state);
                return Some((url, state));
            }
        }
        None
    }

    /// Pending URLs in queue order
    pub fn pending_urls(&self) -> Vec<String> {
        self.queue
            .iter()
            .filter(|url| self.states.get(*url).is_some_and(UrlState::is_pending))
            .cloned()
            .collect()
    }

    /// All known URLs in discovery order
    pub fn known_urls(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn known_count(&self) -> usize {
        self.order.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    pub fn visited_count(&self) -> usize {
        self.visited
    }

    /// Reserves the next fetch slot for this site
    ///
    /// Consecutive reservations are spaced by at least `delay`. The first
    /// reservation starts immediately.
    ///
    /// # Returns
    ///
    /// How long the caller must wait before starting its fetch
    pub fn reserve_fetch_slot(&mut self, delay: Duration, now: Instant) -> Duration {
        let start = match self.next_fetch_at {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_fetch_at = Some(start.checked_add(delay).unwrap_or(start));
        start.saturating_duration_since(now)
    }

    /// Adds an unknown URL to the known set without queueing it
    fn record(&mut self, url: &str, state: UrlState) -> bool {
        if self.states.contains_key(url) {
            return false;
        }
        self.count(state, true);
        self.states.insert(url.to_string(), state);
        self.order.push(url.to_string());
        true
    }

    fn count(&mut self, state: UrlState, add: bool) {
        let counter = match state {
            UrlState::Pending => &mut self.pending,
            UrlState::Visited => &mut self.visited,
            UrlState::Excluded => return,
        };
        if add {
            *counter += 1;
        } else {
            *counter = counter.saturating_sub(1);
        }
    }
}

/// Converts a delay in seconds to a `Duration`
///
/// Invalid values become zero, values above [`MAX_CRAWL_DELAY`] are clamped.
pub(crate) fn delay_from_secs(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs.min(MAX_CRAWL_DELAY)).unwrap_or(Duration::ZERO)
}
