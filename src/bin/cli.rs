//! contract-watch CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use contract_watch::{
    client::{HttpPageClient, PageClient},
    error::{AppError, Result},
    models::{Config, SearchQuery, TargetConfig},
    notify::{LogNotifier, Notifier, TelegramNotifier},
    pipeline::{self, CrossReferencer, PipelineContext, Snapshotter},
    storage::LocalLog,
    utils::{console, http},
};
use tokio_util::sync::CancellationToken;

/// contract-watch - Verified contract listing watcher
#[derive(Parser, Debug)]
#[command(
    name = "contract-watch",
    version,
    about = "Watches explorer listings for contracts already published on GitHub"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch targets until Ctrl-C
    Watch {
        /// Stop each target after N polling cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Only watch these targets (repeatable; default: all)
        #[arg(long = "target")]
        targets: Vec<String>,
    },

    /// Print one listing snapshot as JSON
    Snapshot {
        #[arg(long)]
        target: String,
    },

    /// Run one GitHub cross-reference lookup
    Search {
        /// Address or contract name
        term: String,

        /// Target whose search settings to use (default: first target)
        #[arg(long)]
        target: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Resolve `--target` names, or every configured target when none are given.
fn select_targets(config: &Config, names: &[String]) -> Result<Vec<TargetConfig>> {
    if names.is_empty() {
        return Ok(config.targets.clone());
    }
    names
        .iter()
        .map(|name| {
            config
                .target(name)
                .cloned()
                .ok_or_else(|| AppError::config(format!("Unknown target '{name}'")))
        })
        .collect()
}

fn find_target<'a>(config: &'a Config, name: Option<&str>) -> Result<&'a TargetConfig> {
    match name {
        Some(name) => config
            .target(name)
            .ok_or_else(|| AppError::config(format!("Unknown target '{name}'"))),
        None => config
            .targets
            .first()
            .ok_or_else(|| AppError::config("No targets defined")),
    }
}

fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    let client = http::create_async_client(&config.client)?;
    match TelegramNotifier::from_config(client, &config.notify) {
        Some(notifier) => Ok(Arc::new(notifier)),
        None => {
            log::warn!("Telegram credentials not set; matches will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();

    match cli.command {
        Command::Watch { cycles, targets } => {
            config.validate()?;
            let targets = select_targets(&config, &targets)?;

            console::header("contract-watch");
            for target in &targets {
                console::sub_item(&format!(
                    "{} -> {}",
                    target.name(),
                    target.listing_url(&config.listing)
                ));
            }

            let notifier = build_notifier(&config)?;
            let results = Arc::new(LocalLog::new(&config.log.path));
            let mut ctx = PipelineContext::from_config(&config, notifier, results);
            ctx.settings.max_cycles = cycles;

            let cancel = CancellationToken::new();
            let signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Shutdown requested, stopping drivers...");
                    signal.cancel();
                }
            });

            let client_config = config.client.clone();
            let summary = pipeline::run_targets(
                targets,
                ctx,
                move |_| HttpPageClient::new(&client_config),
                cancel,
            )
            .await;

            for fault in &summary.faults {
                console::fault(&format!(
                    "{} stopped at {}: {}",
                    fault.target,
                    fault.at.to_rfc3339(),
                    fault.error
                ));
            }
            console::summary(
                "Watch finished",
                &[
                    ("Targets finished", summary.finished.len().to_string()),
                    ("Targets faulted", summary.faults.len().to_string()),
                    (
                        "Cycles",
                        summary
                            .finished
                            .iter()
                            .map(|s| s.cycles)
                            .sum::<u64>()
                            .to_string(),
                    ),
                    ("Matches", summary.matches().to_string()),
                    ("Outcome log", config.log.path.clone()),
                ],
            );

            if !summary.faults.is_empty() && summary.finished.is_empty() {
                return Err(AppError::config("Every target stopped on a fault"));
            }
        }

        Command::Snapshot { target } => {
            let target = find_target(&config, Some(&target))?;
            let mut client = HttpPageClient::new(&config.client)?;
            let cancel = CancellationToken::new();

            let outcome = Snapshotter::from_config(&config)
                .snapshot(&mut client, target, config.watch.snapshot_size, &cancel)
                .await;
            client.release().await?;

            let snapshot = outcome?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Command::Search { term, target } => {
            let target = find_target(&config, target.as_deref())?;
            let mut client = HttpPageClient::new(&config.client)?;
            let cancel = CancellationToken::new();

            let query = SearchQuery {
                term,
                language: target.language.clone(),
                result_type: target.result_type,
                max_comments: target.max_comments,
                max_results: target.max_results,
            };
            let referencer = CrossReferencer::from_config(&config);
            log::info!("Searching {}", referencer.query_url(&query)?);

            let outcome = referencer.search(&mut client, &query, &cancel).await;
            client.release().await?;

            println!("{:?}", outcome?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} targets)", config.targets.len());
        }
    }

    Ok(())
}
