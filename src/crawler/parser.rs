//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Link targets (from <a> tags and canonical links)
//! - The document base (`<base href>`)
//! - The declared document language (`<html lang>`)
//! - The meta-refresh target, if any ([`find_meta_refresh`])

use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Raw link targets in document order, unresolved
    pub hrefs: Vec<String>,

    /// The `<base href>` value, if present
    pub base_href: Option<String>,

    /// The `<html lang>` value, if present
    pub language: Option<String>,
}

/// Parses HTML content and extracts link targets and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<link rel="stylesheet" ...>`
/// - `<script src="...">`
/// - `<img src="...">`
/// - `<a href="..." download>`
///
/// `rel="nofollow"` links are kept. Scheme filtering happens in
/// [`resolve_link`].
///
/// # Example
///
/// ```
/// use sumi_spider::crawler::parse_html;
///
/// let html = r#"<html lang="en"><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.hrefs, vec!["/page".to_string()]);
/// assert_eq!(parsed.language.as_deref(), Some("en"));
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        hrefs: extract_hrefs(&document),
        base_href: first_attr(&document, "base[href]", "href"),
        language: first_attr(&document, "html[lang]", "lang"),
    }
}

/// Returns the declared language of a document (`<html lang>`)
pub fn document_language(html: &str) -> Option<String> {
    parse_html(html).language
}

/// Returns the `content` of the first meta-refresh tag
///
/// The `http-equiv` value is matched case-insensitively.
pub fn find_meta_refresh(html: &str) -> Option<String> {
    extract_refresh(&Html::parse_document(html))
}

/// Extracts and resolves all crawlable links of a document
///
/// Relative links are resolved against `<base href>` when present, else
/// against `page_url`.
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let parsed = parse_html(html);
    let base = effective_base(parsed.base_href.as_deref(), page_url);

    parsed
        .hrefs
        .iter()
        .filter_map(|href| resolve_link(href, &base))
        .map(|url| url.to_string())
        .collect()
}

/// Picks the URL relative links are resolved against
///
/// A `<base href>` is honoured only if it resolves to an HTTP(S) URL.
pub fn effective_base(base_href: Option<&str>, page_url: &Url) -> Url {
    base_href
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - Empty and fragment-only links
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .filter(|url| url.host_str().is_some_and(|h| !h.is_empty()))
}

fn extract_hrefs(document: &Html) -> Vec<String> {
    let mut hrefs = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href.to_string());
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href.to_string());
            }
        }
    }

    hrefs
}

fn extract_refresh(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[http-equiv]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(str::to_string)
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
