//! Harvester CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use harvester::{
    error::Result,
    models::{Config, CrawlWindow},
    pipeline::{self, CrawlContext, CrawlRequest},
    storage::{ArchiveStore, Ledger, RunState},
};

/// Harvester - incremental news archiver
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Incremental, date-windowed news crawler"
)]
struct Cli {
    /// Path to storage directory containing config.toml, ledger and archives
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl sources and archive new articles
    Crawl {
        /// Source URLs (e.g. https://cointelegraph.com)
        #[arg(required = true)]
        sources: Vec<String>,

        /// Newest publication time to include (RFC 3339, default: now)
        #[arg(long, value_parser = parse_timestamp)]
        from: Option<DateTime<Utc>>,

        /// Oldest publication time to include (RFC 3339, default: last run)
        #[arg(long, value_parser = parse_timestamp)]
        to: Option<DateTime<Utc>>,

        /// Crawl only these tags instead of discovering them
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Print an archived article as JSON
    Retrieve {
        /// Archive path, archive file name or article link
        archive: String,
    },

    /// Unpack an archived article
    Extract {
        /// Archive path, archive file name or article link
        archive: String,

        /// Output directory (default: {storage_dir}/extracted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate configuration
    Validate,

    /// Show storage paths, ledger size and last run
    Info,
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::debug!("Loaded configuration from {}", config_path.display());

    match cli.command {
        Command::Crawl {
            sources,
            from,
            to,
            tags,
        } => {
            let ctx = CrawlContext::open(config, &cli.storage_dir).await?;

            let window = match (from, to) {
                (None, None) => None,
                (from, to) => {
                    let to = match to {
                        Some(to) => to,
                        None => ctx.state.load_last_run().await?,
                    };
                    Some(CrawlWindow::new(from.unwrap_or_else(Utc::now), to)?)
                }
            };

            let request = CrawlRequest {
                sources,
                tags,
                window,
            };

            let outcome = pipeline::run_crawler(&ctx, &request).await;
            ctx.ledger.close().await;

            match outcome {
                Ok(report) => {
                    log::info!(
                        "Archived {} new articles ({} skipped, {} failed)",
                        report.archived,
                        report.skipped,
                        report.failed
                    );
                }
                // Only configuration problems fail the process.
                Err(e) if e.is_config_error() => return Err(e),
                Err(e) => log::error!("Crawl aborted: {}", e),
            }
        }

        Command::Retrieve { archive } => {
            let store = ArchiveStore::new(config.paths.archive_dir(&cli.storage_dir));
            let article = pipeline::retrieve_article(&store, &archive).await?;
            println!("{}", serde_json::to_string_pretty(&article)?);
        }

        Command::Extract { archive, out } => {
            let store = ArchiveStore::new(config.paths.archive_dir(&cli.storage_dir));
            let out_dir = out.unwrap_or_else(|| cli.storage_dir.join("extracted"));
            let (html, json) = pipeline::extract_article(&store, &archive, &out_dir).await?;
            println!("{}\n{}", html.display(), json.display());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK ({})", config_path.display());
        }

        Command::Info => {
            let archive_dir = config.paths.archive_dir(&cli.storage_dir);
            let ledger_file = config.paths.ledger_file(&cli.storage_dir);
            let state = RunState::new(config.paths.last_run_file(&cli.storage_dir));

            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!("Archives: {}", archive_dir.display());

            if ledger_file.exists() {
                let ledger = Ledger::open(&ledger_file).await?;
                log::info!(
                    "Ledger: {} ({} links)",
                    ledger_file.display(),
                    ledger.count().await?
                );
                ledger.close().await;
            } else {
                log::info!("Ledger: {} (not created yet)", ledger_file.display());
            }

            match state.load_last_run().await {
                Ok(at) => log::info!("Last run: {}", at.to_rfc3339()),
                Err(e) => log::warn!("Last run unreadable: {}", e),
            }
        }
    }

    Ok(())
}
