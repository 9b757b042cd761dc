//! cbs-scrape main entry point
//!
//! This is the command-line interface for searching one web site.

use anyhow::Context;
use cbs_scrape::config::{load_config_with_hash, Config};
use cbs_scrape::output::{MarkdownWriter, SearchSummary, SummaryWriter};
use cbs_scrape::SiteSearch;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// cbs-scrape: a cache-aware site search crawler
///
/// Crawls a single site depth-first, runs the configured regular-expression
/// searches on every page and reports where each match was found.
#[derive(Parser, Debug)]
#[command(name = "cbs-scrape")]
#[command(version)]
#[command(about = "A cache-aware site search crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be searched without crawling
    #[arg(long)]
    dry_run: bool,

    /// Search this host or URL instead of the configured target
    #[arg(long, value_name = "URL")]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(url) = cli.url {
        tracing::info!("Overriding target {} with {}", config.target.url, url);
        config.target.url = url;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_search(&config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cbs_scrape=info,warn"),
            1 => EnvFilter::new("cbs_scrape=debug,info"),
            2 => EnvFilter::new("cbs_scrape=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== cbs-scrape Dry Run ===\n");

    println!("Target:");
    println!("  URL: {}", config.target.url);
    match (config.target.scheme, config.target.ssl_valid) {
        (Some(scheme), Some(ssl_valid)) => {
            println!("  Scheme: {} (ssl valid: {})", scheme, ssl_valid)
        }
        _ => println!("  Scheme: probed"),
    }

    println!("\nCrawler Configuration:");
    println!("  Scrape: {}", config.crawler.scrape);
    println!("  Timeout: {}s", config.crawler.timeout);
    println!("  Max frames: {}", config.crawler.max_frames);
    println!("  Max links: {}", config.crawler.max_hrefs);
    println!("  Max depth: {}", config.crawler.max_depth);
    match config.crawler.branch_quota() {
        Some(quota) => println!("  Max links per branch: {}", quota),
        None => println!("  Max links per branch: unlimited"),
    }
    println!(
        "  Valid extensions: {}",
        config.crawler.valid_extensions.join(", ")
    );
    if !config.crawler.rank_keywords.is_empty() {
        println!(
            "  Rank keywords: {}",
            config.crawler.rank_keywords.join(", ")
        );
    }
    if !config.crawler.stop_on_found.is_empty() {
        println!("  Stop on: {}", config.crawler.stop_on_found.join(", "));
    }

    println!("\nHTTP:");
    println!("  Retries: {}", config.http.retries);
    println!("  Backoff factor: {}", config.http.backoff_factor);
    println!("  User agent: {}", config.http.user_agent);
    if let Some(proxy) = &config.http.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\nCache:");
    if config.cache.enabled {
        println!("  Directory: {}", config.cache.directory);
        match config.cache.max_size {
            Some(size) => println!("  Max size: {} bytes", size),
            None => println!("  Max size: unlimited"),
        }
    } else {
        println!("  Disabled");
    }

    println!("\nSearches ({}):", config.search.len());
    for entry in &config.search {
        println!("  - {}: {}", entry.name, entry.pattern_str());
    }

    println!("\n✓ Configuration is valid");
}

/// Runs the site search and reports the results
async fn handle_search(config: &Config, config_hash: String) -> anyhow::Result<()> {
    tracing::info!(
        "Searching {} for {} patterns",
        config.target.url,
        config.search.len()
    );

    let search = SiteSearch::from_config(config)
        .await
        .with_context(|| format!("Failed to search {}", config.target.url))?;

    println!("{}", search);

    if let Some(path) = &config.output.summary_path {
        let summary = SearchSummary::from_search(&search, Some(config_hash));
        MarkdownWriter::new(path)
            .write_summary(&summary)
            .with_context(|| format!("Failed to write summary to {}", path))?;
        println!("✓ Summary written to: {}", path);
    }

    Ok(())
}
