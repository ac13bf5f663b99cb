//! Watchwatcher main entry point
//!
//! This is the command-line interface for the watch catalog price tracker.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use watchwatcher::config::load_config_with_hash;
use watchwatcher::crawler::StopReason;
use watchwatcher::{StoredItem, WatchService};

/// Watchwatcher: tracks listing prices of a watch catalog
///
/// Each crawl walks the catalog page by page, records every listing and
/// keeps a price history per product. Run `crawl` once a day from cron.
#[derive(Parser, Debug)]
#[command(name = "watchwatcher")]
#[command(version = "1.0.0")]
#[command(about = "A price tracker for a watch catalog", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the catalog and merge every listing into the store
    Crawl {
        /// Process only the first listing of the first page
        #[arg(long)]
        test_mode: bool,
    },
    /// Show the summary of the last completed crawl
    Status,
    /// Count stored listings per brand
    Brands,
    /// Count stored listings per series of a brand
    Series {
        #[arg(value_name = "BRAND")]
        brand: String,
    },
    /// List stored listings of a series or a model
    Items(ItemsArgs),
    /// List every document key
    Keys,
    /// Delete a document by key
    Delete {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

#[derive(Args, Debug)]
struct ItemsArgs {
    #[arg(long)]
    brand: String,

    #[arg(long, conflicts_with = "model", required_unless_present = "model")]
    series: Option<String>,

    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let service = WatchService::open(&config).context("Failed to open watch service")?;

    match cli.command {
        Command::Crawl { test_mode } => handle_crawl(&service, test_mode).await?,
        Command::Status => match service.get_status()? {
            Some(status) => println!("{}", status),
            None => println!("No crawl has completed yet"),
        },
        Command::Brands => {
            for brand in service.list_brands()? {
                println!("{:>6}  {}", brand.count, brand.brand);
            }
        }
        Command::Series { brand } => {
            for series in service.list_series(&brand)? {
                println!(
                    "{:>6}  {}  {}",
                    series.count,
                    series.series,
                    series.image_url.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Items(args) => {
            let items = match (&args.series, &args.model) {
                (Some(series), _) => service.list_items_by_series(&args.brand, series)?,
                (None, Some(model)) => service.list_items_by_model(&args.brand, model)?,
                (None, None) => Vec::new(),
            };
            print_items(&items);
        }
        Command::Keys => {
            for key in service.list_keys()? {
                println!("{}", key);
            }
        }
        Command::Delete { key } => {
            service.delete_item(&key)?;
            println!("✓ Deleted {}", key);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("watchwatcher=info,warn"),
            1 => EnvFilter::new("watchwatcher=debug,info"),
            2 => EnvFilter::new("watchwatcher=trace,debug"),
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

/// Runs a crawl and waits for it so a scheduler sees the outcome
async fn handle_crawl(service: &WatchService, test_mode: bool) -> anyhow::Result<()> {
    if test_mode {
        tracing::info!("Starting test crawl (first listing of the first page only)");
    } else {
        tracing::info!("Starting crawl");
    }

    let report = service.run_crawl(test_mode).await.context("Crawl task failed")?;

    println!("=== Crawl Report ===\n");
    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Listings seen: {}", report.observations.len());
    println!("  Persisted:     {}", report.persisted);
    println!("  Failed:        {}", report.failed);
    match &report.stop_reason {
        StopReason::EmptyPage { page } => println!("  Stopped:       empty page {}", page),
        StopReason::FetchFailed { page, error } => {
            tracing::error!("Crawl truncated at page {}: {}", page, error);
            println!("  Stopped:       fetch failed on page {}", page);
        }
        StopReason::TestMode => println!("  Stopped:       test mode"),
    }
    println!("\n{}", report.summary());

    Ok(())
}

fn print_items(items: &[StoredItem]) {
    for item in items {
        let offer = item
            .last_price
            .offer
            .map(|offer| format!(" (offer {:.2})", offer))
            .unwrap_or_default();
        println!(
            "{:>10}  {:>10.2}{}  {} {} {}  age {}  box {}  papers {}  [{} prices]",
            item.key,
            item.last_price.price,
            offer,
            item.listing.brand,
            item.listing.series,
            item.listing.model,
            item.listing.age,
            item.listing.box_status,
            item.listing.papers,
            item.price_history.len()
        );
    }
}
