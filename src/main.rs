//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the Listing-Harvester search-result harvester.

use anyhow::{Context, Result};
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, validate, Config};
use listing_harvester::harvester::{Harvester, HttpPageSource, RunConfig};
use listing_harvester::output::{
    export_csv, generate_markdown_summary, generate_summary, load_statistics, print_statistics,
};
use listing_harvester::storage::{SqliteStorage, Storage, FIND_LIMIT};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a paced search-result harvester
///
/// Listing-Harvester walks the result pages of a marketplace search for one
/// keyword, extracts every listing, stops at a record cap or the end of the
/// results, and stores what it found in SQLite.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A paced search-result harvester", long_about = None)]
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

    /// Override the search keyword
    #[arg(long)]
    keyword: Option<String>,

    /// Override the record cap
    #[arg(long, allow_negative_numbers = true)]
    max_records: Option<i64>,

    /// Override the page size (1-100)
    #[arg(long)]
    page_size: Option<u32>,

    /// Search stored records by title or description and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["stats", "dry_run"])]
    search: Option<String>,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["search", "dry_run"])]
    stats: bool,

    /// Validate config and show the first request without harvesting
    #[arg(long, conflicts_with_all = ["search", "stats"])]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(query) = &cli.search {
        handle_search(&config, query)
    } else {
        handle_harvest(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

/// Applies `--keyword`, `--max-records` and `--page-size` on top of the file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(keyword) = &cli.keyword {
        config.harvest.keyword = keyword.clone();
    }
    if let Some(max_records) = cli.max_records {
        config.harvest.max_records = max_records;
    }
    if let Some(page_size) = cli.page_size {
        config.harvest.page_size = page_size;
    }
}

fn open_database(config: &Config) -> Result<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))
}

/// Handles the --dry-run mode: validates config and shows the first request
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Listing-Harvester Dry Run ===\n");

    println!("Harvest:");
    println!("  Keyword: {}", config.harvest.keyword);
    println!("  Max records: {}", config.harvest.max_records);
    println!("  Page size: {}", config.harvest.page_size);

    println!("\nHTTP:");
    println!("  Endpoint: {}", config.http.base_url);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!(
        "  Attempts per page: {} (backoff factor {}s)",
        config.http.max_attempts, config.http.backoff_factor_secs
    );
    println!("  User-Agent: {}", config.http.user_agent);

    println!("\nPacing:");
    println!("  Delay before each request: {}ms", config.pacing.request_delay_ms);
    println!(
        "  Name-resolution retry delay: {}ms",
        config.pacing.dns_retry_delay_ms
    );
    match config.pacing.dns_max_retries {
        Some(max) => println!("  Name-resolution retries per page: {}", max),
        None => println!("  Name-resolution retries per page: unbounded"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(path) = &config.output.export_path {
        println!("  CSV export: {}", path);
    }
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }

    let run = RunConfig::from_config(&config.harvest);
    println!("\n✓ Configuration is valid");
    if run.cap().is_some() {
        let source = HttpPageSource::new(&config.http)?;
        println!("✓ First request: {}", source.search_url(&run.request(1)));
    } else {
        println!("✓ max-records is not positive, no request would be made");
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --search mode: prints stored records matching a query
fn handle_search(config: &Config, query: &str) -> Result<()> {
    let storage = open_database(config)?;
    let records = storage.find(query)?;

    println!(
        "Found {} records containing \"{}\"{}\n",
        records.len(),
        query,
        if records.len() == FIND_LIMIT {
            " (limit reached)"
        } else {
            ""
        }
    );
    for record in &records {
        println!("- {} | {} | {}", record.title, record.price, record.location);
        println!("  {}", record.url);
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> Result<()> {
    let mut storage = open_database(config)?;
    let run = RunConfig::from_config(&config.harvest);

    let run_id = storage.create_run(&run.keyword, config_hash)?;
    tracing::info!("Created run {} for keyword '{}'", run_id, run.keyword);

    let mut harvester =
        Harvester::from_config(config).context("Failed to set up the harvester")?;
    let outcome = harvester.run(&run).await;

    storage.persist(run_id, &outcome.records)?;
    storage.finish_run(run_id, outcome.stop_reason, outcome.records.len())?;

    if let Some(path) = &config.output.export_path {
        export_csv(&outcome.records, Path::new(path))
            .with_context(|| format!("Failed to export CSV to {}", path))?;
    }

    if let Some(path) = &config.output.summary_path {
        let summary = generate_summary(&storage)?;
        generate_markdown_summary(&summary, Path::new(path))
            .with_context(|| format!("Failed to write summary to {}", path))?;
        tracing::info!("Summary written to {}", path);
    }

    if outcome.stop_reason.is_success() {
        tracing::info!(
            "Run {} finished ({}): {} records from {} pages",
            run_id,
            outcome.stop_reason,
            outcome.records.len(),
            outcome.pages_fetched
        );
    } else {
        tracing::warn!(
            "Run {} stopped early ({}): kept {} records. Last error: {}",
            run_id,
            outcome.stop_reason,
            outcome.records.len(),
            outcome.last_error.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}
