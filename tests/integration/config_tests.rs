//! Configuration files driving a crawl

use std::io::Write;
use sumi_spider::config::load_config;
use sumi_spider::{HttpFetcher, SpiderError, Spider};
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_temp_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_configured_navigation_patterns() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/rubrik/kultur">Kultur</a>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rubrik/kultur"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/artikel/1">1</a>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let file = create_temp_config(
        r#"
[crawler]
default-crawl-delay = 0.0
max-seen-urls = 5

[heuristics]
navigation-patterns = ["/rubrik/"]
"#,
    );
    let config = load_config(file.path()).unwrap();
    let fetcher = HttpFetcher::new(&config).unwrap();
    let spider = Spider::new(config, fetcher).unwrap();

    let outcome = spider
        .focused_crawler(&format!("{}/", base_url), None, None, None)
        .await
        .unwrap();

    assert_eq!(outcome.visited_count, 2);
    assert_eq!(outcome.todo, vec![format!("{}/artikel/1", base_url)]);
}

#[test]
fn test_invalid_config_is_rejected_by_spider() {
    let mut config = sumi_spider::Config::default();
    config.heuristics.navigation_patterns = vec!["(unclosed".to_string()];
    let fetcher = HttpFetcher::new(&config).unwrap();

    let result = Spider::new(config, fetcher);
    assert!(matches!(result, Err(SpiderError::Config(_))));
}
