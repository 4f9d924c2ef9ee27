//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::sync::Arc;
use sumi_spider::config::Config;
use sumi_spider::crawler::probe_alternative_homepage;
use sumi_spider::{crawl_sites, CrawlPhase, HttpFetcher, Spider, UrlState, UrlStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration without politeness delays
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.default_crawl_delay = 0.0;
    config.crawler.request_timeout = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn create_spider() -> Spider<HttpFetcher> {
    let config = create_test_config();
    let fetcher = HttpFetcher::new(&config).expect("Failed to build fetcher");
    Spider::new(config, fetcher).expect("Failed to build spider")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/plain"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_probe_follows_http_redirect() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/landing", base_url).as_str()),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/landing", "<html><body>Landing</body></html>").await;

    let config = create_test_config();
    let fetcher = HttpFetcher::new(&config).unwrap();
    let probe = probe_alternative_homepage(&fetcher, &format!("{}/start", base_url))
        .await
        .expect("Probe should succeed");

    assert_eq!(probe.homepage, format!("{}/landing", base_url));
    assert_eq!(probe.base_url, base_url);
    assert_eq!(probe.status, 200);
}

#[tokio::test]
async fn test_probe_follows_meta_refresh() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><head><meta http-equiv="refresh" content="0; url={}/real"></head></html>"#,
            base_url
        ),
    )
    .await;
    mount_page(&server, "/real", "<html><body>Real homepage</body></html>").await;

    let config = create_test_config();
    let fetcher = HttpFetcher::new(&config).unwrap();
    let probe = probe_alternative_homepage(&fetcher, &format!("{}/", base_url))
        .await
        .expect("Probe should succeed");

    assert_eq!(probe.homepage, format!("{}/real", base_url));
    assert!(probe.document.contains("Real homepage"));
}

#[tokio::test]
async fn test_probe_rejects_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config();
    let fetcher = HttpFetcher::new(&config).unwrap();
    let probe = probe_alternative_homepage(&fetcher, &format!("{}/", server.uri())).await;
    assert!(probe.is_none());
}

#[tokio::test]
async fn test_init_crawl_fresh() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_robots(&server, "User-agent: *\nCrawl-delay: 2\nDisallow: /private").await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/tag/news">News</a>
            <a href="/article">Article</a>
            <a href="/private/draft">Draft</a>
            <a href="https://elsewhere.example/">Elsewhere</a>
        </body></html>"#,
    )
    .await;

    let spider = create_spider();
    let session = spider
        .init_crawl(&format!("{}/", base_url), None, None, None)
        .await
        .expect("init_crawl should succeed");

    assert_eq!(session.base_url, base_url);
    assert_eq!(session.iteration, 1);
    assert_eq!(session.phase, CrawlPhase::Initialized);
    assert!(session.still_active);
    assert!(session.rules.is_some());
    assert_eq!(session.known_count, 4);

    let store = spider.store();
    assert_eq!(
        store.find_unvisited_urls(&base_url),
        vec![format!("{}/tag/news", base_url), format!("{}/article", base_url)]
    );
    assert_eq!(
        store.url_state(&format!("{}/private/draft", base_url)),
        Some(UrlState::Excluded)
    );
    assert_eq!(store.get_crawl_delay(&base_url, None), 2.0);
    assert!(store.has_fresh_rules(&base_url));
}

#[tokio::test]
async fn test_init_crawl_without_robots() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/html", "<html><body><p>Nothing to follow</p></body></html>").await;

    let spider = create_spider();
    let session = spider
        .init_crawl(&format!("{}/html", base_url), None, None, None)
        .await
        .unwrap();

    assert!(session.rules.is_none());
    assert!(!session.still_active);
    assert_eq!(
        spider.store().find_known_urls(&base_url),
        vec![format!("{}/html", base_url)]
    );
    assert!(spider.store().find_unvisited_urls(&base_url).is_empty());
    assert_eq!(spider.store().get_crawl_delay(&base_url, None), 5.0);
    assert_eq!(spider.store().get_crawl_delay(&base_url, Some(2.0)), 2.0);
}

#[tokio::test]
async fn test_crawl_page_discovers_links() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/links/2/2",
        r#"<html><body><a href="/links/2/0">0</a> <a href="/links/2/1">1</a></body></html>"#,
    )
    .await;

    let spider = create_spider();
    spider
        .store()
        .add_urls([format!("{}/links/2/2", base_url)], false);

    let step = spider.crawl_page(0, &base_url, None, false, None).await;

    assert_eq!(step.visited_count, 1);
    assert_eq!(step.known_count, 3);
    assert!(!step.still_active);
    assert_eq!(
        spider.store().find_unvisited_urls(&base_url),
        vec![format!("{}/links/2/0", base_url), format!("{}/links/2/1", base_url)]
    );
}

#[tokio::test]
async fn test_crawl_page_records_redirect_target() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/new", r#"<a href="/next">next</a>"#).await;

    let spider = create_spider();
    spider.store().add_urls([format!("{}/old", base_url)], false);

    let step = spider.crawl_page(0, &base_url, None, false, None).await;

    assert_eq!(step.visited_count, 1);
    assert_eq!(
        spider.store().url_state(&format!("{}/new", base_url)),
        Some(UrlState::Visited)
    );
    assert_eq!(
        spider.store().find_unvisited_urls(&base_url),
        vec![format!("{}/next", base_url)]
    );
}

#[tokio::test]
async fn test_crawl_page_survives_errors() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let spider = create_spider();
    spider.store().add_urls([format!("{}/missing", base_url)], false);

    let step = spider.crawl_page(0, &base_url, None, false, None).await;

    assert_eq!(step.visited_count, 1);
    assert_eq!(step.known_count, 1);
    assert_eq!(spider.store().pending_count(&base_url), 0);
}

#[tokio::test]
async fn test_focused_crawler_follows_navigation() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/tag/a">Tag</a><a href="/post/1">Post 1</a>"#,
    )
    .await;
    mount_page(&server, "/tag/a", r#"<a href="/post/2">Post 2</a>"#).await;

    let spider = create_spider();
    let outcome = spider
        .focused_crawler(&format!("{}/", base_url), None, None, None)
        .await
        .unwrap();

    assert_eq!(outcome.visited_count, 2);
    assert_eq!(
        outcome.todo,
        vec![format!("{}/post/1", base_url), format!("{}/post/2", base_url)]
    );
    assert_eq!(outcome.known.len(), 4);
}

#[tokio::test]
async fn test_focused_crawler_respects_max_seen_urls() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/category/1">1</a><a href="/category/2">2</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/category/1"))
        .respond_with(html("<p>one</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let spider = create_spider();
    let outcome = spider
        .focused_crawler(&format!("{}/", base_url), Some(1), None, None)
        .await
        .unwrap();

    assert_eq!(outcome.visited_count, 1);
    assert_eq!(outcome.todo.len(), 2);
}

#[tokio::test]
async fn test_robots_disallow_is_never_fetched() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/tag/x">Private</a><a href="/tag/open">Open</a>"#,
    )
    .await;
    mount_page(&server, "/tag/open", "<p>open</p>").await;
    Mock::given(method("GET"))
        .and(path("/private/tag/x"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let spider = create_spider();
    let outcome = spider
        .focused_crawler(&format!("{}/", base_url), None, None, None)
        .await
        .unwrap();

    assert_eq!(outcome.visited_count, 2);
    assert!(outcome.todo.is_empty());
    assert_eq!(
        spider.store().url_state(&format!("{}/private/tag/x", base_url)),
        Some(UrlState::Excluded)
    );
}

#[tokio::test]
async fn test_huge_robots_crawl_delay_does_not_abort_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_robots(&server, "User-agent: *\nCrawl-delay: 1e19").await;
    mount_page(&server, "/", r#"<a href="/post/1">Post</a>"#).await;

    let spider = create_spider();
    let outcome = spider
        .focused_crawler(&format!("{}/", base_url), None, None, None)
        .await
        .unwrap();

    assert_eq!(outcome.visited_count, 1);
    assert_eq!(outcome.todo, vec![format!("{}/post/1", base_url)]);
    assert_eq!(
        spider.store().get_crawl_delay(&base_url, None),
        sumi_spider::config::MAX_CRAWL_DELAY
    );
}

#[tokio::test]
async fn test_crawl_pending_fetches_in_parallel() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/p/1">1</a><a href="/p/2">2</a><a href="/p/3">3</a><a href="/p/4">4</a>"#,
    )
    .await;
    for i in 1..=4 {
        Mock::given(method("GET"))
            .and(path(format!("/p/{}", i)))
            .respond_with(html(&format!(r#"<a href="/p/{}/more">more</a>"#, i)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let spider = create_spider();
    let mut session = spider
        .init_crawl(&format!("{}/", base_url), None, None, None)
        .await
        .unwrap();

    let step = spider.crawl_pending(&mut session, 10).await;

    assert_eq!(step.visited_count, 5);
    assert_eq!(session.iteration, 5);
    assert_eq!(step.known_count, 9);
    assert_eq!(spider.store().pending_count(&base_url), 4);
}

#[tokio::test]
async fn test_stop_signal_halts_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", r#"<a href="/tag/a">a</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/tag/a"))
        .respond_with(html("<p>a</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let spider = create_spider();
    spider.stop_signal().stop();

    let outcome = spider
        .focused_crawler(&format!("{}/", base_url), None, None, None)
        .await
        .unwrap();

    assert_eq!(outcome.visited_count, 1);
    assert_eq!(outcome.todo, vec![format!("{}/tag/a", base_url)]);
}

#[tokio::test]
async fn test_crawl_sites_runs_each_seed() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mount_page(&first, "/", r#"<a href="/one">1</a>"#).await;
    mount_page(&second, "/", r#"<a href="/a">a</a><a href="/b">b</a>"#).await;

    let config = create_test_config();
    let fetcher = HttpFetcher::new(&config).unwrap();
    let seeds = vec![format!("{}/", first.uri()), format!("{}/", second.uri())];

    let results = crawl_sites(config, fetcher, &seeds, None).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, seeds[0]);
    assert_eq!(results[0].1.as_ref().unwrap().known.len(), 2);
    assert_eq!(results[1].1.as_ref().unwrap().known.len(), 3);
}

#[tokio::test]
async fn test_shared_store_between_spiders() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", r#"<a href="/post">p</a>"#).await;

    let store = Arc::new(UrlStore::new());
    let spider = create_spider().with_store(Arc::clone(&store));
    spider
        .init_crawl(&format!("{}/", base_url), None, None, None)
        .await
        .unwrap();

    assert_eq!(store.known_count(&base_url), 2);
    assert_eq!(store.visited_count(&base_url), 1);
}
