//! Integration tests for Sumi-Spider
//!
//! These tests use wiremock to serve small sites and run the crawler
//! against them over real HTTP.

mod config_tests;
mod crawl_tests;
