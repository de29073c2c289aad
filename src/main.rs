//! Anjuke-Harvest main entry point
//!
//! This is the command-line interface for the Anjuke-Harvest listing crawler.

use anjuke_harvest::config::{load_config_with_hash, validate, Config};
use anjuke_harvest::crawler::{run_crawl, run_detail_urls};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Anjuke-Harvest: a resilient rental-listing crawler
///
/// Walks the rental catalog region by region, visits every listing's detail
/// page, and writes validated records to CSV or SQLite.
#[derive(Parser, Debug)]
#[command(name = "anjuke-harvest")]
#[command(version)]
#[command(about = "A resilient rental-listing crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Crawl these detail pages instead of walking the catalog
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Override the per-region page ceiling
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the total record ceiling
    #[arg(long, value_name = "N")]
    max_total: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(max_total) = cli.max_total {
        config.crawl.max_total_houses = max_total;
    }
    validate(&config)?;

    let urls = cli
        .urls
        .iter()
        .map(|u| Url::parse(u).map_err(|e| format!("Invalid --url '{}': {}", u, e)))
        .collect::<Result<Vec<_>, _>>()?;

    if cli.dry_run {
        print_dry_run(&config, &urls);
        return Ok(());
    }

    let result = if urls.is_empty() {
        run_crawl(&config, &config_hash).await
    } else {
        run_detail_urls(&config, &config_hash, &urls).await
    };

    match result {
        Ok(summary) => {
            println!("{}", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("anjuke_harvest=info,warn"),
            1 => EnvFilter::new("anjuke_harvest=debug,info"),
            2 => EnvFilter::new("anjuke_harvest=trace,debug"),
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

/// Prints the effective settings without touching the network
fn print_dry_run(config: &Config, urls: &[Url]) {
    println!("=== Anjuke-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  Base URL: {}", config.crawl.base_url);
    let regions = config.crawl.region_slots();
    println!("  Regions ({}):", regions.len());
    for region in &regions {
        println!("    - {}", region.as_deref().unwrap_or("(whole catalog)"));
    }
    println!("  Max pages per region: {}", config.crawl.max_pages);
    println!("  Max links per page: {}", config.crawl.max_houses_per_page);
    println!("  Max total records: {}", config.crawl.max_total_houses);

    println!("\nPacing:");
    println!(
        "  Post-load delay: {}-{}ms",
        config.pacing.min_delay_ms, config.pacing.max_delay_ms
    );
    println!("  Page interval: {}ms", config.pacing.page_interval_ms);
    println!("  Timeout: {}ms", config.pacing.timeout_ms);

    let anti = &config.anti_detection;
    println!("\nAnti-detection:");
    println!("  Stealth: {}", anti.stealth);
    println!("  Auto verification: {}", anti.auto_verification);
    println!("  Attempts per URL: {}", anti.max_retries);
    println!("  Proxies: {}", anti.proxies.len());

    println!("\nValidation:");
    if config.validation.enabled {
        println!(
            "  Price: {}-{} yuan",
            config.validation.min_price, config.validation.max_price
        );
        println!(
            "  Area: {}-{} m²",
            config.validation.min_area, config.validation.max_area
        );
    } else {
        println!("  Disabled");
    }

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Path: {}", config.output.path);
    println!("  Append: {}, dedup: {}", config.output.append, config.output.dedup);

    println!("\n✓ Configuration is valid");
    if urls.is_empty() {
        println!(
            "✓ Would walk {} region(s) starting at {}",
            regions.len(),
            config.crawl.base_url
        );
    } else {
        println!("✓ Would crawl {} detail URL(s)", urls.len());
    }
}
