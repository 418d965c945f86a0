// src/pipeline/mod.rs

//! Pipeline entry points for crawler operations.
//!
//! - `build_service`: Wire the fetcher, crawlers and snapshot store together
//! - `serve`: Run the refresh cadences until shutdown

pub mod scheduler;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::crawlers::CrawlerRegistry;
use crate::error::Result;
use crate::models::Config;
use crate::services::RankingService;
use crate::storage::{SqliteRankingStore, init_pool};
use crate::utils::http::HttpFetcher;

pub use scheduler::{Cadence, Job, Scheduler};

/// Grace period for in-flight runs after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Build the ranking service from configuration.
///
/// Opens (and migrates) the database; `cancel` aborts fetch retries.
pub async fn build_service(
    config: &Config,
    cancel: CancellationToken,
) -> Result<Arc<RankingService>> {
    let pool = init_pool(&config.database.path).await?;
    let fetcher = HttpFetcher::new(&config.crawler, cancel)?;
    let registry = CrawlerRegistry::with_default_crawlers();

    log::info!(
        "Ranking service ready ({} sites: {})",
        registry.supported_sites().len(),
        registry.supported_sites().join(", ")
    );

    Ok(Arc::new(RankingService::new(
        registry,
        Arc::new(fetcher),
        Arc::new(SqliteRankingStore::new(pool)),
        &config.ingest,
    )))
}

/// Run the scheduler until `shutdown` completes.
pub async fn serve(config: &Config, shutdown: impl Future<Output = ()>) -> Result<()> {
    let cancel = CancellationToken::new();
    let service = build_service(config, cancel.clone()).await?;
    let scheduler = Arc::new(Scheduler::new(service, config.schedule.clone()));

    let cron = scheduler.start(&cancel).await?;
    log::info!(
        "Serving with {} scheduled jobs",
        if cron.is_some() { scheduler.jobs().len() } else { 0 }
    );

    shutdown.await;
    log::info!("Shutdown requested, stopping scheduled jobs");
    cancel.cancel();

    if let Some(mut cron) = cron {
        cron.shutdown().await?;
    }
    scheduler.drain(SHUTDOWN_GRACE).await;

    Ok(())
}
