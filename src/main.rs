//! Sumi-Spider main entry point
//!
//! This is the command-line interface for the Sumi-Spider focused crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_spider::config::{load_config, Config};
use sumi_spider::{CrawlOutcome, HttpFetcher, Spider};
use tracing_subscriber::EnvFilter;

/// Sumi-Spider: a focused, polite web crawler
///
/// Sumi-Spider explores a website from its homepage, following navigation
/// pages while respecting robots.txt and crawl delays, and reports the
/// pages it found.
#[derive(Parser, Debug)]
#[command(name = "sumi-spider")]
#[command(version)]
#[command(about = "A focused, polite web crawler", long_about = None)]
struct Cli {
    /// Homepages to crawl, one focused crawl each
    #[arg(value_name = "URL", required = true)]
    seeds: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Maximum number of pages to visit per site
    #[arg(long)]
    max_seen_urls: Option<usize>,

    /// Stop once more URLs than this are known for a site
    #[arg(long)]
    max_known_urls: Option<usize>,

    /// Only follow links that look like this language (e.g. "de")
    #[arg(long)]
    lang: Option<String>,

    /// Print the URLs still pending, not only the counts
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(max_seen) = cli.max_seen_urls {
        config.crawler.max_seen_urls = max_seen;
    }
    if let Some(max_known) = cli.max_known_urls {
        config.crawler.max_known_urls = max_known;
    }

    let fetcher = HttpFetcher::new(&config).context("Failed to build HTTP client")?;
    let spider = Spider::new(config, fetcher)?;

    let stop = spider.stop_signal().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current page steps");
            stop.stop();
        }
    });

    let results = spider.crawl_sites(&cli.seeds, cli.lang.as_deref()).await;

    let mut failures = 0;
    for (seed, result) in &results {
        match result {
            Ok(outcome) => print_outcome(seed, outcome, cli.list),
            Err(e) => {
                tracing::error!("Crawl of {} failed: {}", seed, e);
                failures += 1;
            }
        }
    }

    if failures == results.len() {
        anyhow::bail!("All {} crawls failed", failures);
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_spider=info,warn"),
            1 => EnvFilter::new("sumi_spider=debug,info"),
            2 => EnvFilter::new("sumi_spider=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn print_outcome(seed: &str, outcome: &CrawlOutcome, list: bool) {
    println!("=== {} ===", seed);
    println!("  Visited: {}", outcome.visited_count);
    println!("  Known:   {}", outcome.known.len());
    println!("  Pending: {}", outcome.todo.len());

    if list {
        for url in &outcome.todo {
            println!("    {}", url);
        }
    }
}
