//! User-Harvest main entry point
//!
//! This is the command-line interface for crawling the remote user directory,
//! building the filtered dataset, and serving it.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use user_harvest::config::{apply_environment, load_config_with_hash, Config};
use user_harvest::crawler::run_crawl;
use user_harvest::pipeline::{build_dataset, FilterCriteria};
use user_harvest::server::{serve, AppState, Credentials};
use user_harvest::storage::{append_users, load_users, save_users};

/// User-Harvest: a rate-limit-aware user directory harvester
#[derive(Parser, Debug)]
#[command(name = "user-harvest")]
#[command(version)]
#[command(about = "Harvest, filter and serve user records", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "harvest.toml")]
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
    /// Crawl users and save the raw output
    Crawl(CrawlArgs),

    /// Deduplicate and filter the raw output
    Filter,

    /// Serve the filtered dataset
    Serve,

    /// Crawl, then filter
    Run(CrawlArgs),
}

#[derive(clap::Args, Debug)]
struct CrawlArgs {
    /// Number of users to collect
    #[arg(long, default_value_t = 100)]
    count: u64,

    /// Only collect users with an id greater than this; a non-zero cursor
    /// resumes an earlier crawl and appends to its raw output
    #[arg(long, default_value_t = 0)]
    since: u64,

    /// Append to the raw output even when starting from cursor 0
    #[arg(long)]
    append: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = if cli.config.exists() {
        let (config, hash) = load_config_with_hash(&cli.config)?;
        tracing::info!("Configuration loaded successfully (hash: {})", hash);
        config
    } else {
        tracing::warn!("{} not found, using defaults", cli.config.display());
        Config::default()
    };
    apply_environment(&mut config)?;

    match cli.command {
        Command::Crawl(args) => handle_crawl(&config, &args).await,
        Command::Filter => handle_filter(&config),
        Command::Serve => handle_serve(&config).await,
        Command::Run(args) => {
            handle_crawl(&config, &args).await?;
            handle_filter(&config)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("user_harvest=info,warn"),
            1 => EnvFilter::new("user_harvest=debug,tower_http=debug,info"),
            2 => EnvFilter::new("user_harvest=trace,debug"),
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

/// Crawls and saves whatever was collected, even after a fatal stop
async fn handle_crawl(config: &Config, args: &CrawlArgs) -> anyhow::Result<()> {
    if config.api.token.is_none() {
        tracing::warn!("No API token configured; requests are unauthenticated");
    }

    let result = run_crawl(config, args.count, args.since).await?;
    let raw_path = Path::new(&config.data.raw_path);
    if args.append || args.since > 0 {
        let total = append_users(raw_path, &result.users)?;
        tracing::info!("{} records now stored in {}", total, raw_path.display());
    } else {
        save_users(raw_path, &result.users)?;
    }

    tracing::info!(
        "Got information about {} users. {} failed pages and {} failed users.",
        result.users.len(),
        result.failed_pages,
        result.failed_users
    );

    if result.stop.is_completed() {
        tracing::info!("Crawl completed successfully");
    } else {
        tracing::warn!(
            "Crawl stopped early ({:?}); resume with --since {}",
            result.stop,
            result.cursor
        );
    }

    Ok(())
}

/// Builds the filtered dataset from the raw output
fn handle_filter(config: &Config) -> anyhow::Result<()> {
    let criteria = FilterCriteria::from_config(&config.filter)?;
    let users = load_users(Path::new(&config.data.raw_path))?;
    let dataset = build_dataset(&criteria, users);
    save_users(Path::new(&config.data.filtered_path), &dataset)?;
    Ok(())
}

/// Loads the filtered dataset and serves it
async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let users = load_users(Path::new(&config.data.filtered_path))?;
    let credentials = Credentials::new(&config.server.authorized_users);
    serve(&config.server, AppState::new(users, credentials)).await?;
    Ok(())
}
