//! insight-hub CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use insight_hub::{
    error::Result,
    models::{Config, HarvestSummary},
    pipeline,
    storage::{LocalStorage, MemoryStorage, StorageBackend},
    store::Store,
};

/// insight-hub - Blog Post Harvester
#[derive(Parser, Debug)]
#[command(
    name = "insight-hub",
    version,
    about = "Harvests blog posts and stores each one exactly once"
)]
struct Cli {
    /// Path to the configuration file (defaults are used if it is missing)
    #[arg(short, long, default_value = "insight-hub.toml")]
    config: PathBuf,

    /// Override the data directory from the configuration
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest new posts from all (or the named) sources
    Harvest {
        /// Only harvest this source (repeatable)
        #[arg(long = "source", value_name = "NAME")]
        sources: Vec<String>,

        /// Fetch and extract, but keep everything in memory
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    Validate,

    /// List configured sources with their indexed link counts
    Sources,
}

/// Initialize logging; RUST_LOG wins over the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = Config::load_or_default(&cli.config);
    let level = match &loaded {
        Ok(config) => config.logging.level.as_str(),
        Err(_) => "info",
    };
    init_logging(cli.verbose, level);

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::error!(
                "Cannot load configuration from {}: {}",
                cli.config.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };
    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!(
            "{} not found, using the built-in configuration",
            cli.config.display()
        );
    }
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<ExitCode> {
    let local = LocalStorage::new(&config.storage.data_dir);

    match command {
        Command::Harvest { sources, dry_run } => {
            config.validate()?;
            let adapters = pipeline::build_adapters(&config, &sources)?;

            let backend: Arc<dyn StorageBackend> = if dry_run {
                log::info!("Dry run: nothing will be written");
                Arc::new(MemoryStorage::over(local))
            } else {
                log::info!("Data directory: {}", config.storage.data_dir.display());
                Arc::new(local)
            };

            let deadline = (config.crawler.run_deadline_secs > 0)
                .then(|| Duration::from_secs(config.crawler.run_deadline_secs));
            let shutdown = pipeline::shutdown_signal(deadline);

            let summary = pipeline::run_harvest(
                adapters,
                backend,
                config.crawler.max_concurrent_sources,
                shutdown,
            )
            .await;
            print_summary(&summary);

            if summary.failed_sources().is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK ({} sources)", config.sources.len());
            Ok(ExitCode::SUCCESS)
        }

        Command::Sources => {
            for source in &config.sources {
                let (store, load) = Store::open(&local, &source.name).await?;
                println!(
                    "{:<24} {:>6} links  {}",
                    source.name,
                    store.len(),
                    source.home_page
                );
                if load.skipped > 0 {
                    log::warn!("[{}] {} damaged index lines", source.name, load.skipped);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(summary: &HarvestSummary) {
    let elapsed = summary.end_time - summary.start_time;
    println!(
        "{:<24} {:>6} {:>6} {:>6} {:>6}  status",
        "source", "saved", "known", "failed", "pages"
    );
    for report in &summary.reports {
        let failed =
            report.fetch_failures + report.invalid + report.save_failures + report.untidy;
        let status = if let Some(error) = &report.error {
            format!("error: {error}")
        } else if report.is_failure() {
            "unreachable".to_string()
        } else if report.cancelled {
            "cancelled".to_string()
        } else {
            "ok".to_string()
        };
        println!(
            "{:<24} {:>6} {:>6} {:>6} {:>6}  {}",
            report.source, report.saved, report.duplicates, failed, report.pages, status
        );
    }
    println!(
        "{} new posts in {}.{:03}s",
        summary.saved(),
        elapsed.num_seconds(),
        elapsed.num_milliseconds().rem_euclid(1000)
    );
}
