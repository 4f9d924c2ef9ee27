use url::Url;

/// ISO 639-1 codes recognized as locale markers in URLs
const LANGUAGE_CODES: &[&str] = &[
    "ar", "bg", "bn", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et", "eu", "fa",
    "fi", "fr", "ga", "gl", "he", "hi", "hr", "hu", "hy", "is", "it", "ja", "ka", "kk",
    "ko", "lt", "lv", "mk", "ms", "mt", "nb", "nl", "nn", "no", "pl", "pt", "ro", "ru", "sk",
    "sl", "sq", "sr", "sv", "sw", "ta", "th", "tr", "uk", "ur", "vi", "zh",
];

/// Query parameters that commonly carry a locale
const LANGUAGE_PARAMS: &[&str] = &["lang", "language", "locale", "hl", "lng"];

/// Decides whether a piece of text or a URL plausibly matches a language
///
/// Implementations must be pure: the same input always yields the same
/// answer and no state is mutated.
pub trait LanguageOracle: Send + Sync {
    /// Returns true unless `text_or_path` is known to be in another language
    fn matches_language(&self, text_or_path: &str, language: &str) -> bool;
}

/// Default oracle based on locale markers
///
/// - For URLs: looks for a language segment in the path (`/en/`, `/de-AT/`,
///   `/fr_FR/`), a language query parameter (`?lang=de`) or a language
///   subdomain (`en.example.org`)
/// - For language tags (e.g. the `<html lang>` attribute): compares the
///   primary subtag
/// - For anything else: no evidence, so it matches
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleHeuristic;

impl LanguageOracle for LocaleHeuristic {
    fn matches_language(&self, text_or_path: &str, language: &str) -> bool {
        let wanted = primary_subtag(language);
        if wanted.is_empty() {
            return true;
        }

        let input = text_or_path.trim();
        let found = match Url::parse(input) {
            Ok(url) if url.has_host() => url_locale(&url),
            _ if input.starts_with('/') => path_locale(input),
            _ if looks_like_language_tag(input) => Some(primary_subtag(input)),
            _ => None,
        };

        match found {
            Some(code) => code == wanted,
            None => true,
        }
    }
}

/// Finds the first locale marker in a URL
fn url_locale(url: &Url) -> Option<String> {
    for (key, value) in url.query_pairs() {
        if LANGUAGE_PARAMS.contains(&key.to_lowercase().as_str()) {
            let code = primary_subtag(&value);
            if is_language_code(&code) {
                return Some(code);
            }
        }
    }

    if let Some(code) = path_locale(url.path()) {
        return Some(code);
    }

    // en.example.org, but not www.example.org or a bare two-label host
    let host = url.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        let code = labels[0].to_lowercase();
        if is_language_code(&code) {
            return Some(code);
        }
    }

    None
}

/// Finds a locale segment in a URL path
fn path_locale(path: &str) -> Option<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .find_map(|segment| {
            if !looks_like_language_tag(segment) {
                return None;
            }
            let code = primary_subtag(segment);
            is_language_code(&code).then_some(code)
        })
}

/// Lowercased primary language subtag: `de-AT` → `de`, `fr_FR` → `fr`
fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Accepts `xx`, `xx-YY`, `xx_YY` and `xx-Hant` style tags
fn looks_like_language_tag(candidate: &str) -> bool {
    let mut parts = candidate.split(['-', '_']);
    let primary_ok = parts
        .next()
        .map(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);
    primary_ok
        && parts.all(|p| (2..=4).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn is_language_code(code: &str) -> bool {
    LANGUAGE_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        let oracle = LocaleHeuristic;
        assert!(oracle.matches_language("https://example.org/en/page1", "en"));
        assert!(!oracle.matches_language("https://example.org/en/page2", "de"));
        assert!(oracle.matches_language("https://example.org/de-AT/seite", "de"));
        assert!(!oracle.matches_language("https://example.org/fr_FR/page", "en"));
    }

    #[test]
    fn test_no_marker_matches() {
        let oracle = LocaleHeuristic;
        assert!(oracle.matches_language("https://example.org/page2", "de"));
        assert!(oracle.matches_language("https://example.org/tag/number1", "en"));
        // two-letter segments that are not language codes are ignored
        assert!(oracle.matches_language("https://example.org/xx/page", "de"));
    }

    #[test]
    fn test_query_and_subdomain() {
        let oracle = LocaleHeuristic;
        assert!(!oracle.matches_language("https://example.org/page?lang=fr", "de"));
        assert!(oracle.matches_language("https://example.org/page?hl=de-CH", "de"));
        assert!(!oracle.matches_language("https://en.example.org/page", "de"));
        assert!(oracle.matches_language("https://www.example.org/page", "de"));
    }

    #[test]
    fn test_bare_path() {
        let oracle = LocaleHeuristic;
        assert!(!oracle.matches_language("/en/about", "de"));
        assert!(oracle.matches_language("/de/about", "de"));
    }

    #[test]
    fn test_language_tags() {
        let oracle = LocaleHeuristic;
        assert!(oracle.matches_language("en-US", "en"));
        assert!(!oracle.matches_language("en-US", "de"));
        assert!(oracle.matches_language("DE", "de"));
    }

    #[test]
    fn test_free_text_has_no_evidence() {
        let oracle = LocaleHeuristic;
        assert!(oracle.matches_language("Call me Ishmael.", "de"));
        assert!(oracle.matches_language("", "de"));
    }

    #[test]
    fn test_empty_language_matches_everything() {
        let oracle = LocaleHeuristic;
        assert!(oracle.matches_language("https://example.org/en/page", ""));
    }
}
