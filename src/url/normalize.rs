use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a URL so that equivalent spellings dedupe to one entry
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Lowercase the host (the `url` crate already does this for
///    special schemes; default ports are dropped as well)
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters
/// 7. Sort remaining query parameters by name; pairs are kept as written,
///    so a valueless `?print` stays `?print`
/// 8. Remove empty query string (trailing ?)
///
/// # Examples
///
/// ```
/// use sumi_spider::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.org/page1/?").unwrap();
/// assert_eq!(url.as_str(), "https://example.org/page1");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
            }
        }
        _ => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let filtered_params = filter_and_sort_query_params(query);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&filtered_params.join("&")));
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts the remaining raw pairs by name
///
/// Pairs are returned exactly as written in the query.
fn filter_and_sort_query_params(query: &str) -> Vec<String> {
    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .map(|pair| (pair.split_once('=').map_or(pair, |(key, _)| key), pair))
        .filter(|(key, _)| !key.is_empty() && !is_tracking_param(key))
        .collect();

    params.sort();

    params.into_iter().map(|(_, pair)| pair.to_string()).collect()
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_scheme() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_empty_query() {
        let result = normalize_url("https://example.org/en/page1/?").unwrap();
        assert_eq!(result.as_str(), "https://example.org/en/page1");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = normalize_url("https://example.com/page?utm_source=twitter").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_mixed_query_params() {
        let result = normalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123",
        )
        .unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/page?another=value&keep=yes"
        );
    }

    #[test]
    fn test_valueless_query_params_kept_as_written() {
        let result = normalize_url("https://example.com/page?print").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?print");

        let result = normalize_url("https://example.com/page?b=&print&a=1&&utm_source=x").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=&print");
    }

    #[test]
    fn test_query_values_are_not_reencoded() {
        let result = normalize_url("https://example.com/search?q=a%20b&lang=de").unwrap();
        assert_eq!(result.as_str(), "https://example.com/search?lang=de&q=a%20b");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_default_port_dropped() {
        let result = normalize_url("https://example.com:443/page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");

        let result = normalize_url("http://127.0.0.1:8080/page/").unwrap();
        assert_eq!(result.as_str(), "http://127.0.0.1:8080/page");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://example.com///path//to///page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));

        let result = normalize_url("mailto:user@example.org");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("xyz").is_err());
        assert!(normalize_url("1234").is_err());
    }

    #[test]
    fn test_trailing_slash_variants_dedupe() {
        let a = normalize_url("https://example.org/page1").unwrap();
        let b = normalize_url("https://example.org/page1/").unwrap();
        assert_eq!(a, b);
    }
}
