use crate::config::HeuristicsConfig;
use crate::ConfigError;
use regex::Regex;

/// Compiled path heuristics used to classify links
///
/// Two ordered lists of patterns, both matched against the normalized URL:
///
/// - **navigation**: listing pages (tags, categories, pagination) whose
///   presence in the pending queue justifies continuing a focused crawl
/// - **not crawlable**: pages recorded as known but never fetched
///   (login, admin, feeds, binary documents)
///
/// # Examples
///
/// ```
/// use sumi_spider::url::PathRules;
///
/// let rules = PathRules::default();
/// assert!(rules.is_navigation("https://example.org/tag/number1"));
/// assert!(!rules.is_navigation("https://example.org/en/page1"));
/// assert!(rules.is_not_crawlable("https://example.org/login"));
/// ```
#[derive(Debug, Clone)]
pub struct PathRules {
    navigation: Vec<Regex>,
    not_crawlable: Vec<Regex>,
}

impl PathRules {
    /// Compiles the pattern lists from configuration
    pub fn from_config(config: &HeuristicsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            navigation: compile_all(&config.navigation_patterns)?,
            not_crawlable: compile_all(&config.not_crawlable_patterns)?,
        })
    }

    /// Returns true if the URL looks like a listing/navigation page
    pub fn is_navigation(&self, url: &str) -> bool {
        self.navigation.iter().any(|re| re.is_match(url))
    }

    /// Returns true if the URL must never be fetched
    pub fn is_not_crawlable(&self, url: &str) -> bool {
        self.not_crawlable.iter().any(|re| re.is_match(url))
    }
}

impl Default for PathRules {
    fn default() -> Self {
        // The default patterns are covered by the config validation tests
        Self::from_config(&HeuristicsConfig::default())
            .unwrap_or_else(|_| Self {
                navigation: Vec::new(),
                not_crawlable: Vec::new(),
            })
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile() {
        let config = HeuristicsConfig::default();
        let rules = PathRules::from_config(&config).unwrap();
        assert_eq!(rules.navigation.len(), config.navigation_patterns.len());
        assert_eq!(rules.not_crawlable.len(), config.not_crawlable_patterns.len());
    }

    #[test]
    fn test_navigation_pages() {
        let rules = PathRules::default();
        assert!(rules.is_navigation("https://example.org/tag/number1"));
        assert!(rules.is_navigation("https://example.org/tag/1"));
        assert!(rules.is_navigation("https://example.org/category/news"));
        assert!(rules.is_navigation("https://example.org/blog/page/2"));
        assert!(rules.is_navigation("https://example.org/blog?page=3"));
        assert!(rules.is_navigation("https://example.org/author/jane"));
        assert!(rules.is_navigation("https://example.org/tags"));
    }

    #[test]
    fn test_content_pages() {
        let rules = PathRules::default();
        assert!(!rules.is_navigation("https://example.org/en/page1"));
        assert!(!rules.is_navigation("https://example.org/page2"));
        assert!(!rules.is_navigation("https://example.org/2023/05/a-post-about-tagging"));
        assert!(!rules.is_navigation("https://example.org/links/2/0"));
        assert!(!rules.is_navigation("https://example.org/catalogue-item"));
    }

    #[test]
    fn test_not_crawlable() {
        let rules = PathRules::default();
        assert!(rules.is_not_crawlable("https://example.org/login"));
        assert!(rules.is_not_crawlable("https://example.org/wp-admin/edit.php"));
        assert!(rules.is_not_crawlable("https://example.org/wp-login.php"));
        assert!(rules.is_not_crawlable("https://example.org/feed"));
        assert!(rules.is_not_crawlable("https://example.org/files/report.pdf"));
        assert!(rules.is_not_crawlable("https://example.org/post?replytocom=12"));

        assert!(!rules.is_not_crawlable("https://example.org/page1"));
        assert!(!rules.is_not_crawlable("https://example.org/blog/logins-explained"));
    }

    #[test]
    fn test_custom_patterns() {
        let config = HeuristicsConfig {
            navigation_patterns: vec![r"/rubrik/".to_string()],
            not_crawlable_patterns: vec![r"/intern/".to_string()],
        };
        let rules = PathRules::from_config(&config).unwrap();
        assert!(rules.is_navigation("https://example.de/rubrik/politik"));
        assert!(!rules.is_navigation("https://example.de/tag/politik"));
        assert!(rules.is_not_crawlable("https://example.de/intern/x"));
    }

    #[test]
    fn test_invalid_pattern() {
        let config = HeuristicsConfig {
            navigation_patterns: vec!["(".to_string()],
            not_crawlable_patterns: vec![],
        };
        assert!(matches!(
            PathRules::from_config(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }
}
