//! feedwatch CLI
//!
//! Continuous and one-shot entry points over the same feed and record shape.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use feedwatch::{
    error::Result,
    models::Config,
    pipeline::{self, CycleSettings, FeedCycle, Scheduler},
    services::HttpFeedSource,
    storage::{LocalStorage, SnapshotStore},
    utils,
};

/// feedwatch - syndication feed watcher
#[derive(Parser, Debug)]
#[command(
    name = "feedwatch",
    version,
    about = "Polls a syndication feed and records new entries"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a cycle now and then on the configured interval
    Watch,

    /// Fetch once and overwrite the output file, without diffing
    Once {
        /// Output file (default: paths.output_file under paths.storage_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show what the store currently holds
    Info,
}

/// Initialize logging from config, with `--verbose` forcing debug.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
    utils::log::init(config.logging.style);
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);
    init_logging(&config, cli.verbose);

    log::info!("Loaded configuration from {}", cli.config.display());

    let storage = LocalStorage::new(&config.paths.storage_dir);

    match cli.command {
        Command::Watch => {
            config.validate()?;
            let source = Arc::new(HttpFeedSource::new(&config.feed)?);
            let cycle = Arc::new(FeedCycle::new(
                source,
                Arc::new(storage),
                CycleSettings::from_config(&config),
            ));

            let scheduler = Scheduler::new(config.schedule.interval())?;
            utils::log::header(&format!(
                "Watching {} every {}s",
                config.feed.url, config.schedule.interval_secs
            ));
            let handle = scheduler.start(cycle);

            tokio::select! {
                result = handle.wait() => result?,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Interrupted, shutting down");
                }
            }
        }

        Command::Once { output } => {
            config.validate()?;
            let source = HttpFeedSource::new(&config.feed)?;
            let output_key = match output {
                Some(path) => pipeline::resolve_output(&std::env::current_dir()?, &path)
                    .display()
                    .to_string(),
                None => config.paths.output_file.clone(),
            };

            pipeline::run_once(
                &source,
                &storage,
                &output_key,
                config.schedule.entry_policy(),
            )
            .await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let key = &config.paths.store_file;
            log::info!("Feed: {}", config.feed.url);
            log::info!("Store: {}", storage.describe(key));

            let snapshot = storage.load(key).await?;
            if snapshot.is_absent() {
                log::info!("No store found yet.");
                return Ok(());
            }

            let snapshot = snapshot.into_snapshot();
            utils::log::summary(
                "Store",
                &[
                    ("records", snapshot.len().to_string()),
                    (
                        "newest",
                        snapshot
                            .records()
                            .first()
                            .map(|r| r.title.clone())
                            .unwrap_or_default(),
                    ),
                ],
            );
            for title in pipeline::diff::titles(snapshot.records()).iter().take(5) {
                utils::log::sub_item(title);
            }
        }
    }

    Ok(())
}
