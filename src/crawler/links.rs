//! Link classification and feeding of the URL store
//!
//! Every link found on a page ends up in one of three places:
//! - dropped (not crawlable at all, or external while external links are off)
//! - recorded as known but excluded (non-crawlable path, wrong language,
//!   disallowed by robots.txt)
//! - queued as pending in the URL store

use crate::crawler::parser::{effective_base, parse_html, resolve_link, ParsedPage};
use crate::robots::{is_allowed, RobotsRules};
use crate::store::{UrlState, UrlStore};
use crate::url::{normalize_url, origin_of, LanguageOracle, LocaleHeuristic, PathRules};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A link found on a page, with everything needed to decide its fate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The href as written in the document
    pub raw_href: String,
    /// Absolute, normalized URL; `None` when the link is not crawlable at all
    pub resolved_url: Option<String>,
    /// Same origin as the page's site
    pub is_internal: bool,
    /// Looks like a listing page (tag, category, pagination)
    pub is_navigation: bool,
    /// Not matched by any not-crawlable pattern
    pub is_crawlable: bool,
    /// Passes the language filter (always true without a filter)
    pub language_ok: bool,
    /// Allowed by robots.txt (always true without rules)
    pub robots_ok: bool,
}

impl Link {
    /// Returns true if the link may enter the todo queue
    pub fn is_queueable(&self) -> bool {
        self.resolved_url.is_some() && self.is_crawlable && self.language_ok && self.robots_ok
    }
}

/// Counts of what a `process_links` call changed in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Newly known URLs queued as pending
    pub added: usize,
    /// Newly known URLs recorded as excluded
    pub excluded: usize,
}

/// Classifies links and feeds them into a URL store
#[derive(Clone)]
pub struct LinkProcessor {
    path_rules: PathRules,
    oracle: Arc<dyn LanguageOracle>,
    user_agent: String,
}

impl fmt::Debug for LinkProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkProcessor")
            .field("path_rules", &self.path_rules)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Default for LinkProcessor {
    fn default() -> Self {
        Self::new(PathRules::default(), Arc::new(LocaleHeuristic), "*")
    }
}

impl LinkProcessor {
    /// Creates a processor
    ///
    /// # Arguments
    ///
    /// * `path_rules` - Navigation and not-crawlable patterns
    /// * `oracle` - Language predicate used when a language filter is set
    /// * `user_agent` - Product token checked against robots.txt
    pub fn new(path_rules: PathRules, oracle: Arc<dyn LanguageOracle>, user_agent: &str) -> Self {
        Self {
            path_rules,
            oracle,
            user_agent: user_agent.to_string(),
        }
    }

    /// Path rules in use
    pub fn path_rules(&self) -> &PathRules {
        &self.path_rules
    }

    /// Language oracle in use
    pub fn oracle(&self) -> &dyn LanguageOracle {
        self.oracle.as_ref()
    }

    /// Extracts and classifies all links of a document
    ///
    /// Links that cannot be resolved to an HTTP(S) URL are returned with
    /// `resolved_url = None`.
    pub fn classify(
        &self,
        html: &str,
        base_url: &str,
        language: Option<&str>,
        rules: Option<&RobotsRules>,
    ) -> Vec<Link> {
        self.classify_parsed(&parse_html(html), base_url, language, rules)
    }

    /// Classifies the links of an already parsed document
    pub fn classify_parsed(
        &self,
        parsed: &ParsedPage,
        base_url: &str,
        language: Option<&str>,
        rules: Option<&RobotsRules>,
    ) -> Vec<Link> {
        let Ok(page_url) = Url::parse(base_url.trim()) else {
            tracing::debug!("Cannot extract links relative to invalid base {}", base_url);
            return Vec::new();
        };
        let site = origin_of(&page_url);
        let base = effective_base(parsed.base_href.as_deref(), &page_url);

        parsed
            .hrefs
            .iter()
            .map(|href| {
                let raw_href = href.clone();
                let resolved = resolve_link(&raw_href, &base)
                    .and_then(|url| normalize_url(url.as_str()).ok());

                match resolved {
                    Some(url) => {
                        let url_str = url.as_str();
                        Link {
                            is_internal: site.is_some() && origin_of(&url) == site,
                            is_navigation: self.path_rules.is_navigation(url_str),
                            is_crawlable: !self.path_rules.is_not_crawlable(url_str),
                            language_ok: language
                                .map_or(true, |lang| self.oracle.matches_language(url_str, lang)),
                            robots_ok: is_allowed(rules, &self.user_agent, url_str),
                            resolved_url: Some(url.to_string()),
                            raw_href,
                        }
                    }
                    None => Link {
                        raw_href,
                        resolved_url: None,
                        is_internal: false,
                        is_navigation: false,
                        is_crawlable: false,
                        language_ok: false,
                        robots_ok: false,
                    },
                }
            })
            .collect()
    }

    /// Extracts links from a document and records them in the store
    ///
    /// New navigation links are queued ahead of the pages already waiting,
    /// in document order; other new links are queued last.
    ///
    /// # Arguments
    ///
    /// * `store` - The URL store to feed
    /// * `html` - The document
    /// * `base_url` - URL the document was fetched from; relative links are
    ///   resolved against it and it defines which links are internal
    /// * `language` - Optional language filter
    /// * `external` - Keep links to other sites
    /// * `rules` - robots.txt rules of the site, if any
    ///
    /// # Returns
    ///
    /// How many URLs became newly known, split by pending and excluded
    pub fn process_links(
        &self,
        store: &UrlStore,
        html: &str,
        base_url: &str,
        language: Option<&str>,
        external: bool,
        rules: Option<&RobotsRules>,
    ) -> LinkReport {
        self.process_parsed(store, &parse_html(html), base_url, language, external, rules)
    }

    /// Records the links of an already parsed document in the store
    ///
    /// See [`process_links`](Self::process_links).
    pub fn process_parsed(
        &self,
        store: &UrlStore,
        parsed: &ParsedPage,
        base_url: &str,
        language: Option<&str>,
        external: bool,
        rules: Option<&RobotsRules>,
    ) -> LinkReport {
        let mut entries = Vec::new();

        for link in self.classify_parsed(parsed, base_url, language, rules) {
            let Some(url) = link.resolved_url.as_deref() else {
                continue;
            };
            if !link.is_internal && !external {
                continue;
            }
            let state = if link.is_queueable() {
                UrlState::Pending
            } else {
                tracing::trace!(
                    "Excluding {} (crawlable: {}, language: {}, robots: {})",
                    url,
                    link.is_crawlable,
                    link.language_ok,
                    link.robots_ok
                );
                UrlState::Excluded
            };
            entries.push((url.to_string(), state, link.is_navigation));
        }

        let mut report = LinkReport::default();
        for (_, state) in store.add_prioritized(entries) {
            match state {
                UrlState::Excluded => report.excluded += 1,
                _ => report.added += 1,
            }
        }
        tracing::debug!(
            "Links from {}: {} queued, {} excluded",
            base_url,
            report.added,
            report.excluded
        );
        report
    }

    /// Returns true if the todo queue still holds a navigation page
    ///
    /// Content-driven, not count-driven: one listing page among many
    /// content pages is enough. An empty queue yields false.
    pub fn is_still_navigation<I, S>(&self, todo: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        todo.into_iter()
            .any(|url| self.path_rules.is_navigation(url.as_ref()))
    }
}

/// Extracts links with the default heuristics and records them in the store
///
/// See [`LinkProcessor::process_links`]; robots checks use the `*` group.
///
/// # Examples
///
/// ```
/// use sumi_spider::crawler::process_links;
/// use sumi_spider::UrlStore;
///
/// let store = UrlStore::new();
/// let html = r#"<a href="https://example.org/page1"/><a href="https://example.org/page1/"/><a href="https://test.org/page1"/>"#;
/// process_links(&store, html, "https://example.org", None, false, None);
/// assert_eq!(store.find_known_urls("https://example.org").len(), 1);
/// ```
pub fn process_links(
    store: &UrlStore,
    html: &str,
    base_url: &str,
    language: Option<&str>,
    external: bool,
    rules: Option<&RobotsRules>,
) -> LinkReport {
    LinkProcessor::default().process_links(store, html, base_url, language, external, rules)
}

/// Navigation check with the default heuristics
///
/// See [`LinkProcessor::is_still_navigation`].
pub fn is_still_navigation<I, S>(todo: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    LinkProcessor::default().is_still_navigation(todo)
}
