//! Homepage resolution: HTTP redirects and meta-refresh tags
//!
//! A seed URL often is not the page a site really serves. Before crawling,
//! the homepage is fetched once; the fetcher reports where HTTP redirects
//! ended, and a `<meta http-equiv="refresh">` tag in the returned document
//! may point further.

use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::parser::find_meta_refresh;
use crate::url::{extract_origin, normalize_url};
use url::Url;

/// Outcome of meta-refresh detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh<'a> {
    /// No usable refresh tag, or one pointing at the current homepage;
    /// the input is handed back untouched
    Unchanged {
        document: &'a str,
        homepage: &'a str,
    },

    /// The tag pointed elsewhere and the target was fetched
    Redirected { document: String, homepage: String },

    /// A target was present but is not an absolute HTTP(S) URL, or could not
    /// be fetched
    Unusable,
}

impl Refresh<'_> {
    /// The homepage after detection, `None` when the target was unusable
    pub fn homepage(&self) -> Option<&str> {
        match self {
            Refresh::Unchanged { homepage, .. } => Some(homepage),
            Refresh::Redirected { homepage, .. } => Some(homepage.as_str()),
            Refresh::Unusable => None,
        }
    }

    /// The document after detection, `None` when the target was unusable
    pub fn document(&self) -> Option<&str> {
        match self {
            Refresh::Unchanged { document, .. } => Some(document),
            Refresh::Redirected { document, .. } => Some(document.as_str()),
            Refresh::Unusable => None,
        }
    }
}

/// Result of probing a homepage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomepageProbe {
    /// The document finally served
    pub document: String,
    /// HTTP status of the homepage fetch
    pub status: u16,
    /// The resolved homepage URL
    pub homepage: String,
    /// Origin of the resolved homepage
    pub base_url: String,
}

/// Extracts the target URL from a meta-refresh `content` value
///
/// Accepts `N; url=target`, `N;URL='target'` and `N; target`. Returns `None`
/// when there is no `;` or the target is empty.
pub fn parse_refresh_content(content: &str) -> Option<String> {
    let (_, target) = content.split_once(';')?;
    let target = target.trim();

    let target = match target.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("url") => {
            let rest = target[3..].trim_start();
            rest.strip_prefix('=').map(str::trim_start).unwrap_or(target)
        }
        _ => target,
    };

    let target = target.trim_matches(|c| c == '"' || c == '\'').trim();
    (!target.is_empty()).then(|| target.to_string())
}

/// Follows a meta-refresh tag, if the document has one
///
/// # Arguments
///
/// * `fetcher` - Used to fetch the refresh target
/// * `document` - The homepage document
/// * `homepage` - URL the document was served from
///
/// # Returns
///
/// * `Refresh::Unchanged` - No tag, no `content`, no `;`-separated target,
///   or a target equal to `homepage`
/// * `Refresh::Unusable` - The target is not an absolute HTTP(S) URL
///   (relative targets included) or fetching it failed
/// * `Refresh::Redirected` - The target's document and final URL
pub async fn refresh_detection<'a, F: Fetcher>(
    fetcher: &F,
    document: &'a str,
    homepage: &'a str,
) -> Refresh<'a> {
    let unchanged = Refresh::Unchanged { document, homepage };

    let Some(target) = find_meta_refresh(document).and_then(|c| parse_refresh_content(&c)) else {
        return unchanged;
    };

    let is_absolute = Url::parse(&target).is_ok_and(|url| {
        (url.scheme() == "http" || url.scheme() == "https") && url.host_str().is_some()
    });
    if !is_absolute {
        tracing::info!("Unusable meta-refresh target '{}' on {}", target, homepage);
        return Refresh::Unusable;
    }

    let same_page = match (normalize_url(&target), normalize_url(homepage)) {
        (Ok(a), Ok(b)) => a == b,
        _ => target == homepage,
    };
    if same_page {
        return unchanged;
    }

    tracing::info!("Following meta-refresh from {} to {}", homepage, target);
    match fetcher.fetch(&target).await {
        FetchResult::Success {
            final_url, body, ..
        } => match body.into_text() {
            Some(document) => Refresh::Redirected {
                document,
                homepage: final_url,
            },
            None => {
                tracing::info!("Meta-refresh target {} returned no text", target);
                Refresh::Unusable
            }
        },
        FetchResult::HttpError { status_code, .. } => {
            tracing::info!("Meta-refresh target {} returned HTTP {}", target, status_code);
            Refresh::Unusable
        }
        FetchResult::NetworkError { error } => {
            tracing::info!("Meta-refresh target {} failed: {}", target, error);
            Refresh::Unusable
        }
    }
}

/// Fetches a homepage and works out where it really lives
///
/// The base URL is the origin of the HTTP redirect target if the fetcher
/// was redirected, then of the meta-refresh target if the document has a
/// usable one, else of the original URL.
///
/// # Returns
///
/// * `Some(HomepageProbe)` - The homepage was fetched
/// * `None` - The fetch failed, returned an HTTP error or no text, or the
///   document carried an unusable meta-refresh target
pub async fn probe_alternative_homepage<F: Fetcher>(fetcher: &F, url: &str) -> Option<HomepageProbe> {
    let (final_url, status, document) = match fetcher.fetch(url).await {
        FetchResult::Success {
            final_url,
            status_code,
            body,
        } => (final_url, status_code, body.into_text()?),
        FetchResult::HttpError { status_code, .. } => {
            tracing::info!("Homepage {} returned HTTP {}", url, status_code);
            return None;
        }
        FetchResult::NetworkError { error } => {
            tracing::info!("Homepage {} could not be fetched: {}", url, error);
            return None;
        }
    };

    let homepage = if final_url != url {
        tracing::info!("Followed homepage redirect: {} -> {}", url, final_url);
        final_url
    } else {
        url.to_string()
    };

    let (document, homepage) = match refresh_detection(fetcher, &document, &homepage).await {
        Refresh::Unchanged { .. } => (document.clone(), homepage.clone()),
        Refresh::Redirected { document, homepage } => (document, homepage),
        Refresh::Unusable => return None,
    };

    let base_url = extract_origin(&homepage)?;
    Some(HomepageProbe {
        document,
        status,
        homepage,
        base_url,
    })
}
