use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_spider::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the site origin (`scheme://host[:port]`) from a URL string
///
/// The origin is the key under which the URL store groups URLs and the
/// base URL a crawl session is scoped to. Default ports are omitted.
///
/// # Returns
///
/// * `Some(String)` - The origin, without a trailing slash
/// * `None` - If the string is not an absolute HTTP(S) URL with a host
///
/// # Examples
///
/// ```
/// use sumi_spider::url::extract_origin;
///
/// assert_eq!(
///     extract_origin("https://httpbun.com/html"),
///     Some("https://httpbun.com".to_string())
/// );
/// assert_eq!(extract_origin("xyz"), None);
/// ```
pub fn extract_origin(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str.trim()).ok()?;
    origin_of(&url)
}

/// Origin of an already-parsed URL
pub fn origin_of(url: &Url) -> Option<String> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = extract_domain(url).filter(|h| !h.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
