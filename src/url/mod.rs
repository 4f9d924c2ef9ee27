//! URL handling module for Sumi-Spider
//!
//! This module provides URL normalization, origin extraction, path
//! heuristics (navigation and not-crawlable pages) and the language oracle
//! used to filter links.

mod domain;
mod language;
mod normalize;
mod rules;

// Re-export main functions
pub use domain::{extract_domain, extract_origin, origin_of};
pub use language::{LanguageOracle, LocaleHeuristic};
pub use normalize::normalize_url;
pub use rules::PathRules;

