//! ga-bill-scraper main entry point
//!
//! This is the command-line interface for the Georgia bill scraper.

use anyhow::Context;
use clap::Parser;
use ga_bill_scraper::config::{load_config_with_hash, validate, Config, OutputFormat};
use ga_bill_scraper::crawler::run_crawl;
use ga_bill_scraper::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ga-bill-scraper: collects Georgia General Assembly bills
///
/// Walks the bill listing on legis.ga.gov in a headless browser, reads every
/// bill's First Reader Summary and Status History, and writes the result as
/// JSON. Detail pages are cached between runs.
#[derive(Parser, Debug)]
#[command(name = "ga-bill-scraper")]
#[command(version = "1.0.0")]
#[command(about = "Scrapes Georgia legislation into JSON", long_about = None)]
struct Cli {
    /// Maximum number of listing pages to scrape (default: all)
    #[arg(value_name = "MAX_PAGES", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the bill list
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Detail page cache file
    #[arg(long, value_name = "FILE")]
    cache: Option<PathBuf>,

    /// Output document shape
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Minimum delay between detail page fetches in milliseconds
    #[arg(long, value_name = "MS", env = "SCRAPER_DELAY_MS")]
    request_delay_ms: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scraped without starting a browser
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_scrape(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ga_bill_scraper=info,warn"),
            1 => EnvFilter::new("ga_bill_scraper=debug,info"),
            2 => EnvFilter::new("ga_bill_scraper=trace,debug"),
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

/// Loads the config file (if any) and layers command-line overrides on top
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = Some(max_pages);
    }
    if let Some(output) = &cli.output {
        config.output.output_path = output.clone();
    }
    if let Some(cache) = &cli.cache {
        config.output.cache_path = cache.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if cli.headful {
        config.browser.headless = false;
    }
    if let Some(delay) = cli.request_delay_ms {
        config.crawler.request_delay_ms = delay;
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== ga-bill-scraper Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing path: {}", config.site.listing_path);

    println!("\nCrawler:");
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: all"),
    }
    println!(
        "  Max consecutive failures: {}",
        config.crawler.max_consecutive_failures
    );
    println!("  Detail request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Listing page delay: {}ms", config.crawler.page_delay_ms);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Base delay: {}ms", config.retry.base_delay_ms);

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Navigation timeout: {}s",
        config.browser.navigation_timeout_secs
    );

    println!("\nOutput:");
    println!("  File: {}", config.output.output_path.display());
    println!("  Cache: {}", config.output.cache_path.display());
    println!("  Format: {:?}", config.output.format);

    println!("\n✓ Configuration is valid");
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config) -> anyhow::Result<()> {
    match run_crawl(config).await {
        Ok(report) => {
            print_statistics(&report);
            tracing::info!("Scrape finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}
