//! Novel rankings CLI
//!
//! Runs the scheduled refreshes, triggers crawls by hand, and prints stored
//! snapshots as JSON.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use novel_rankings::{
    crawlers::{CrawlerRegistry, SiteCrawler},
    error::Result,
    models::{Config, RankingType, site_display_name},
    pipeline::{self, Scheduler},
    services::SaveOutcome,
};
use tokio_util::sync::CancellationToken;

/// Novel ranking crawler
#[derive(Parser, Debug)]
#[command(
    name = "novel-rankings",
    version,
    about = "Crawls novel-site rankings and keeps the latest snapshots"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the refresh schedule until Ctrl+C
    Serve,

    /// Crawl one ranking and store it
    Fetch {
        /// Site identifier, e.g. qidian
        site: String,
        /// Ranking type: monthly, click, recommend or new
        ranking_type: String,
    },

    /// Crawl every site and ranking type once
    FetchAll,

    /// Print a stored ranking as JSON
    Show {
        site: String,
        ranking_type: String,
    },

    /// Print summaries of stored rankings as JSON
    List {
        /// Only this site's rankings
        #[arg(long)]
        site: Option<String>,
    },

    /// List supported sites and their ranking types
    Sites,

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

/// Ctrl+C, and SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C"),
        _ = terminate => log::info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            log::error!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(if e.is_caller_error() { 2 } else { 1 });
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::load_or_default(&cli.config)
    };
    config.validate()?;

    match cli.command {
        Command::Serve => {
            log::info!("Starting scheduler...");
            pipeline::serve(&config, shutdown_signal()).await?;
        }

        Command::Fetch { site, ranking_type } => {
            let service = pipeline::build_service(&config, CancellationToken::new()).await?;
            match service.fetch_and_save(&site, &ranking_type).await? {
                SaveOutcome::Saved { count } => {
                    log::info!("Stored {} records for {} - {}", count, site, ranking_type)
                }
                SaveOutcome::NoData => {
                    log::warn!("No records found for {} - {}", site, ranking_type)
                }
            }
        }

        Command::FetchAll => {
            let cancel = CancellationToken::new();
            let service = pipeline::build_service(&config, cancel.clone()).await?;
            let scheduler = Scheduler::new(service, config.schedule.clone());

            let trigger = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                trigger.cancel();
            });

            let report = scheduler.manual_fetch_all(&cancel).await;
            for failure in &report.failures {
                log::warn!(
                    "  {} - {}: {}",
                    failure.site,
                    failure.ranking_type,
                    failure.error
                );
            }
            log::info!(
                "Fetched {} rankings: {} succeeded, {} failed",
                report.attempted,
                report.succeeded,
                report.failed
            );
        }

        Command::Show { site, ranking_type } => {
            let service = pipeline::build_service(&config, CancellationToken::new()).await?;
            let data = service.get(&site, &ranking_type).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }

        Command::List { site } => {
            let service = pipeline::build_service(&config, CancellationToken::new()).await?;
            let summaries = match site {
                Some(site) => service.list_summaries_for_site(&site).await?,
                None => service.list_summaries().await?,
            };
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }

        Command::Sites => {
            let registry = CrawlerRegistry::with_default_crawlers();
            for crawler in registry.crawlers() {
                let types: Vec<&str> = crawler
                    .supported_types()
                    .iter()
                    .map(RankingType::as_str)
                    .collect();
                println!(
                    "{:<10} {:<8} {}",
                    crawler.site_id(),
                    site_display_name(crawler.site_id()),
                    types.join(", ")
                );
            }
        }

        Command::Validate => {
            log::info!("✓ Config OK ({})", cli.config.display());
        }
    }

    Ok(())
}
