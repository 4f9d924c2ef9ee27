//! Crawler coordinator - focused crawl orchestration
//!
//! This module drives a crawl from its seed to its stop condition:
//! - Validating the seed and resolving the real homepage
//! - Fetching and caching robots.txt rules
//! - Taking page steps from the URL store's todo queue
//! - Feeding discovered links back into the store
//! - Stopping once navigation pages are exhausted, a budget is hit or the
//!   caller cancels

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, Fetcher, HttpFetcher};
use crate::crawler::links::{LinkProcessor, LinkReport};
use crate::crawler::parser::parse_html;
use crate::crawler::redirect::probe_alternative_homepage;
use crate::crawler::scheduler::FetchScheduler;
use crate::crawler::session::{CrawlOutcome, CrawlPhase, CrawlSession, PageStep, StopSignal};
use crate::robots::{fetch_robots, is_allowed, RobotsRules};
use crate::store::{UrlState, UrlStore};
use crate::url::{origin_of, normalize_url, LanguageOracle, PathRules};
use crate::{Result, SpiderError};
use std::sync::Arc;
use tokio::task::JoinSet;

/// A focused crawler bound to one URL store
///
/// Clones share the store, the fetcher, the concurrency limit and the stop
/// signal.
pub struct Spider<F> {
    config: Arc<Config>,
    fetcher: Arc<F>,
    store: Arc<UrlStore>,
    links: LinkProcessor,
    scheduler: FetchScheduler,
    stop: StopSignal,
}

impl<F> Clone for Spider<F> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            links: self.links.clone(),
            scheduler: self.scheduler.clone(),
            stop: self.stop.clone(),
        }
    }
}

impl<F: Fetcher> Spider<F> {
    /// Creates a spider with an empty store
    ///
    /// # Returns
    ///
    /// * `Ok(Spider)` - Ready to crawl
    /// * `Err(SpiderError::Config)` - The configuration is invalid
    pub fn new(config: Config, fetcher: F) -> Result<Self> {
        Self::from_shared(Arc::new(config), Arc::new(fetcher))
    }

    /// Creates a spider from a shared configuration and fetcher
    pub fn from_shared(config: Arc<Config>, fetcher: Arc<F>) -> Result<Self> {
        crate::config::validate(&config)?;
        let path_rules = PathRules::from_config(&config.heuristics)?;
        let links = LinkProcessor::new(
            path_rules,
            Arc::new(crate::url::LocaleHeuristic),
            &config.user_agent.crawler_name,
        );

        Ok(Self {
            scheduler: FetchScheduler::new(&config.crawler),
            store: Arc::new(UrlStore::new()),
            stop: StopSignal::new(),
            config,
            fetcher,
            links,
        })
    }

    /// Uses the given store instead of the spider's own
    pub fn with_store(mut self, store: Arc<UrlStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the language predicate used for link filtering
    pub fn with_oracle(mut self, oracle: Arc<dyn LanguageOracle>) -> Self {
        self.links = LinkProcessor::new(
            self.links.path_rules().clone(),
            oracle,
            &self.config.user_agent.crawler_name,
        );
        self
    }

    /// Uses an externally controlled stop signal
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn store(&self) -> &Arc<UrlStore> {
        &self.store
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn user_agent(&self) -> &str {
        &self.config.user_agent.crawler_name
    }

    /// Seeds the store and prepares a crawl session
    ///
    /// # Arguments
    ///
    /// * `start_url` - The seed; must be an absolute HTTP(S) URL
    /// * `known_todo` - URLs to queue as pending, for resuming a crawl
    /// * `known_urls` - URLs already visited, for resuming a crawl
    /// * `lang` - Optional language filter for discovered links
    ///
    /// Without `known_todo` and `known_urls` the homepage is probed: HTTP
    /// and meta-refresh redirects decide the base URL, the homepage is
    /// recorded as visited and its links are queued. Otherwise the given
    /// URLs are seeded as they are and nothing is fetched but robots.txt.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - The initialized session
    /// * `Err(SpiderError::InvalidSeed)` - `start_url` is unusable; the store
    ///   is left untouched
    pub async fn init_crawl(
        &self,
        start_url: &str,
        known_todo: Option<&[String]>,
        known_urls: Option<&[String]>,
        lang: Option<&str>,
    ) -> Result<CrawlSession> {
        let seed = normalize_url(start_url).map_err(|e| SpiderError::InvalidSeed {
            url: start_url.to_string(),
            reason: e.to_string(),
        })?;
        let origin = origin_of(&seed).ok_or_else(|| SpiderError::InvalidSeed {
            url: start_url.to_string(),
            reason: "no host".to_string(),
        })?;

        let (base_url, rules, iteration) = if known_todo.is_none() && known_urls.is_none() {
            let _permit = self.scheduler.acquire().await;
            self.scheduler.wait_for_slot(&self.store, &origin).await;

            let (base_url, homepage, document) =
                match probe_alternative_homepage(self.fetcher.as_ref(), start_url).await {
                    Some(probe) => (probe.base_url, probe.homepage, Some(probe.document)),
                    None => {
                        tracing::warn!("Could not probe homepage {}", start_url);
                        (origin, seed.to_string(), None)
                    }
                };

            self.store.add_urls([homepage.as_str()], true);
            let rules = self.robots_for(&base_url).await;
            if let Some(document) = document {
                self.extract_links(&document, &homepage, rules.as_ref(), lang);
            }
            (base_url, rules, 1)
        } else {
            if let Some(known) = known_urls {
                self.store.add_urls(known, true);
            }
            if let Some(todo) = known_todo {
                self.store.add_urls(todo, false);
            }
            let rules = self.robots_for(&origin).await;
            let visited = self.store.visited_count(&origin);
            (origin, rules, visited)
        };

        let todo = self.store.find_unvisited_urls(&base_url);
        let session = CrawlSession {
            iteration,
            known_count: self.store.known_count(&base_url),
            still_active: self.links.is_still_navigation(&todo),
            phase: CrawlPhase::Initialized,
            lang: lang.map(str::to_string),
            rules,
            base_url,
        };

        tracing::info!(
            "Initialized crawl of {} ({} known, {} pending, robots.txt: {})",
            session.base_url,
            session.known_count,
            todo.len(),
            if session.rules.is_some() { "yes" } else { "no" }
        );
        Ok(session)
    }

    /// Takes one page step
    ///
    /// Pops the first pending URL of `base_url`. A URL disallowed by
    /// `rules` is marked excluded and not fetched. Otherwise the page is
    /// fetched once the site's politeness slot comes up and its links are
    /// fed into the store. With `initial` set, the URL is treated as the
    /// homepage and probed for redirects. Fetch failures are logged and
    /// otherwise ignored.
    ///
    /// # Returns
    ///
    /// The step's outcome; `visited_count` is `iteration + 1` if a URL was
    /// consumed and `iteration` if the queue was empty.
    pub async fn crawl_page(
        &self,
        iteration: usize,
        base_url: &str,
        rules: Option<&RobotsRules>,
        initial: bool,
        lang: Option<&str>,
    ) -> PageStep {
        let agent = self.user_agent();
        let popped = self
            .store
            .next_unvisited_checked(base_url, |url| is_allowed(rules, agent, url));

        let visited_count = match popped {
            None => {
                tracing::debug!("No pending URL left for {}", base_url);
                iteration
            }
            Some((url, UrlState::Excluded)) => {
                tracing::info!("Skipping {} (disallowed by robots.txt)", url);
                iteration + 1
            }
            Some((url, _)) => {
                self.visit(&url, rules, initial, lang).await;
                iteration + 1
            }
        };

        self.step_result(base_url, visited_count)
    }

    /// Runs a focused crawl from a seed to its stop condition
    ///
    /// # Arguments
    ///
    /// * `start_url` - The seed
    /// * `max_seen_urls` - Page budget; defaults to `crawler.max-seen-urls`
    /// * `max_known_urls` - Stop once more URLs are known; defaults to
    ///   `crawler.max-known-urls`
    /// * `lang` - Optional language filter
    ///
    /// The crawl goes on while the todo queue holds a navigation page and
    /// both budgets allow, checking the stop signal between steps.
    pub async fn focused_crawler(
        &self,
        start_url: &str,
        max_seen_urls: Option<usize>,
        max_known_urls: Option<usize>,
        lang: Option<&str>,
    ) -> Result<CrawlOutcome> {
        let max_seen = max_seen_urls.unwrap_or(self.config.crawler.max_seen_urls);
        let max_known = max_known_urls.unwrap_or(self.config.crawler.max_known_urls);

        let mut session = self.init_crawl(start_url, None, None, lang).await?;

        while session.should_continue(max_seen, max_known) {
            if self.stop.is_stopped() {
                tracing::info!("Crawl of {} cancelled", session.base_url);
                break;
            }
            let step = self
                .crawl_page(
                    session.iteration,
                    &session.base_url,
                    session.rules.as_ref(),
                    false,
                    session.lang.as_deref(),
                )
                .await;
            session.apply(step);
        }
        session.finish();

        let outcome = self.outcome(&session);
        tracing::info!(
            "Finished crawl of {}: {} pages visited, {} known, {} pending",
            session.base_url,
            outcome.visited_count,
            outcome.known.len(),
            outcome.todo.len()
        );
        Ok(outcome)
    }

    /// Final state of a session, read back from the store
    pub fn outcome(&self, session: &CrawlSession) -> CrawlOutcome {
        CrawlOutcome {
            todo: self.store.find_unvisited_urls(&session.base_url),
            known: self.store.find_known_urls(&session.base_url),
            visited_count: session.iteration,
        }
    }

    /// Reuses cached robots.txt rules or fetches them
    ///
    /// Fetched rules are cached in the store along with their crawl delay.
    /// A missing or unreadable policy is not cached.
    async fn robots_for(&self, base_url: &str) -> Option<RobotsRules> {
        if self.store.has_fresh_rules(base_url) {
            tracing::debug!("Using cached robots.txt for {}", base_url);
            return self.store.get_rules(base_url);
        }

        let rules = fetch_robots(self.fetcher.as_ref(), base_url).await?;
        self.store
            .store_rules(base_url, rules.clone(), self.user_agent());
        Some(rules)
    }

    /// Fetches one page and processes its links
    async fn visit(&self, url: &str, rules: Option<&RobotsRules>, initial: bool, lang: Option<&str>) {
        let _permit = self.scheduler.acquire().await;
        self.scheduler.wait_for_slot(&self.store, url).await;

        let (document, page_url) = if initial {
            let Some(probe) = probe_alternative_homepage(self.fetcher.as_ref(), url).await else {
                tracing::info!("Homepage {} yielded no document", url);
                return;
            };
            if probe.homepage != url {
                self.store.mark_visited(&probe.homepage);
            }
            (probe.document, probe.homepage)
        } else {
            match self.fetcher.fetch(url).await {
                FetchResult::Success {
                    final_url, body, ..
                } => {
                    if final_url != url {
                        tracing::debug!("{} redirected to {}", url, final_url);
                        self.store.mark_visited(&final_url);
                    }
                    let Some(document) = body.into_text() else {
                        tracing::debug!("No text document at {}", final_url);
                        return;
                    };
                    (document, final_url)
                }
                FetchResult::HttpError { status_code, .. } => {
                    tracing::info!("HTTP {} for {}", status_code, url);
                    return;
                }
                FetchResult::NetworkError { error } => {
                    tracing::info!("Fetching {} failed: {}", url, error);
                    return;
                }
            }
        };

        self.extract_links(&document, &page_url, rules, lang);
    }

    /// Feeds a document's links into the store
    ///
    /// With a language filter set, a document declaring another language
    /// in `<html lang>` contributes no links.
    fn extract_links(
        &self,
        document: &str,
        page_url: &str,
        rules: Option<&RobotsRules>,
        lang: Option<&str>,
    ) -> LinkReport {
        let parsed = parse_html(document);
        if let (Some(lang), Some(declared)) = (lang, parsed.language.as_deref()) {
            if !self.links.oracle().matches_language(declared, lang) {
                tracing::info!(
                    "Ignoring links of {}: language {} instead of {}",
                    page_url,
                    declared,
                    lang
                );
                return LinkReport::default();
            }
        }
        self.links
            .process_parsed(&self.store, &parsed, page_url, lang, false, rules)
    }

    fn step_result(&self, base_url: &str, visited_count: usize) -> PageStep {
        let todo = self.store.find_unvisited_urls(base_url);
        PageStep {
            still_active: self.links.is_still_navigation(&todo),
            known_count: self.store.known_count(base_url),
            visited_count,
        }
    }
}

impl<F: Fetcher + 'static> Spider<F> {
    /// Fetches up to `max_pages` pending URLs of a session in parallel
    ///
    /// URLs are taken from the queue in discovery order; robots-disallowed
    /// ones are marked excluded and count against `max_pages` without being
    /// fetched. Fetches run as tokio tasks bounded by
    /// `crawler.max-concurrent-fetches` and paced per site. The session is
    /// updated with the result.
    pub async fn crawl_pending(&self, session: &mut CrawlSession, max_pages: usize) -> PageStep {
        let agent = self.user_agent();
        let mut tasks = JoinSet::new();
        let mut consumed = 0;

        while consumed < max_pages {
            let popped = self
                .store
                .next_unvisited_checked(&session.base_url, |url| {
                    is_allowed(session.rules.as_ref(), agent, url)
                });
            let Some((url, state)) = popped else {
                break;
            };
            consumed += 1;

            if state == UrlState::Excluded {
                tracing::info!("Skipping {} (disallowed by robots.txt)", url);
                continue;
            }

            let spider = self.clone();
            let rules = session.rules.clone();
            let lang = session.lang.clone();
            tasks.spawn(async move {
                spider
                    .visit(&url, rules.as_ref(), false, lang.as_deref())
                    .await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("Page task failed: {}", e);
            }
        }

        let step = self.step_result(&session.base_url, session.iteration + consumed);
        session.apply(step);
        step
    }

    /// Runs one focused crawl per seed, concurrently
    ///
    /// Every seed gets its own store; the fetcher, the concurrency limit and
    /// the stop signal are shared. Results come back in seed order.
    pub async fn crawl_sites(
        &self,
        seeds: &[String],
        lang: Option<&str>,
    ) -> Vec<(String, Result<CrawlOutcome>)> {
        let mut handles = Vec::with_capacity(seeds.len());

        for seed in seeds {
            let spider = self.clone().with_store(Arc::new(UrlStore::new()));
            let seed = seed.clone();
            let lang = lang.map(str::to_string);
            handles.push(tokio::spawn(async move {
                spider
                    .focused_crawler(&seed, None, None, lang.as_deref())
                    .await
            }));
        }

        let mut results = Vec::with_capacity(seeds.len());
        for (seed, handle) in seeds.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(SpiderError::Task(e)),
            };
            results.push((seed.clone(), result));
        }
        results
    }
}

/// Runs a focused crawl over HTTP
///
/// Convenience wrapper building an [`HttpFetcher`] from `config`.
///
/// # Example
///
/// ```no_run
/// use sumi_spider::config::Config;
/// use sumi_spider::focused_crawler;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let outcome = focused_crawler(&Config::default(), "https://example.org", None, None, None).await?;
/// println!("{} pages left to visit", outcome.todo.len());
/// # Ok(())
/// # }
/// ```
pub async fn focused_crawler(
    config: &Config,
    start_url: &str,
    max_seen_urls: Option<usize>,
    max_known_urls: Option<usize>,
    lang: Option<&str>,
) -> Result<CrawlOutcome> {
    let fetcher = HttpFetcher::new(config)?;
    let spider = Spider::new(config.clone(), fetcher)?;
    spider
        .focused_crawler(start_url, max_seen_urls, max_known_urls, lang)
        .await
}

/// Runs one focused crawl per seed with the given fetcher
///
/// See [`Spider::crawl_sites`].
pub async fn crawl_sites<F: Fetcher + 'static>(
    config: Config,
    fetcher: F,
    seeds: &[String],
    lang: Option<&str>,
) -> Result<Vec<(String, Result<CrawlOutcome>)>> {
    let spider = Spider::new(config, fetcher)?;
    Ok(spider.crawl_sites(seeds, lang).await)
}
