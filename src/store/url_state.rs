/// URL state definitions for the store
///
/// Every known URL is in exactly one of these states.
use std::fmt;

/// Represents where a known URL stands in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    /// Known and waiting to be fetched (part of the todo queue)
    Pending,

    /// Fetched, or consumed by a crawl step whose fetch failed
    Visited,

    /// Known but never to be fetched (non-crawlable path, language
    /// mismatch, robots disallow)
    Excluded,
}

impl UrlState {
    /// Returns true if the URL still waits in the todo queue
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the URL has been consumed by a crawl step
    pub fn is_visited(&self) -> bool {
        matches!(self, Self::Visited)
    }

    /// Returns true if no further processing will happen for this URL
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Short lowercase name, used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Visited => "visited",
            Self::Excluded => "excluded",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
