// src/services/rankings.rs

//! Ranking ingestion and query service.
//!
//! Ties the crawler registry, the page fetcher and the snapshot store
//! together: crawl a ranking and persist it, sweep many rankings in a row,
//! and read stored snapshots back as typed views.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::crawlers::{CrawlerRegistry, crawl};
use crate::error::{AppError, Result};
use crate::models::{
    IngestConfig, NovelRecord, RankingData, RankingSummary, RankingType, snapshot_title,
};
use crate::storage::{RankingStore, StoredRanking};
use crate::utils::http::PageFetcher;

/// Result of a single fetch-and-save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The snapshot now holds `count` records.
    Saved { count: usize },
    /// The crawl produced nothing; the stored snapshot was left untouched.
    NoData,
}

/// One failed pair of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub site: String,
    pub ranking_type: String,
    pub error: String,
}

/// Tally of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// The sweep stopped early on a shutdown signal.
    pub cancelled: bool,
    pub failures: Vec<SweepFailure>,
}

/// Service for crawling rankings and serving stored snapshots.
pub struct RankingService {
    registry: CrawlerRegistry,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn RankingStore>,
    pacing_delay: Duration,
    sweep_types: Vec<RankingType>,
}

impl RankingService {
    pub fn new(
        registry: CrawlerRegistry,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn RankingStore>,
        ingest: &IngestConfig,
    ) -> Self {
        Self {
            registry,
            fetcher,
            store,
            pacing_delay: ingest.pacing_delay(),
            sweep_types: ingest.sweep_types.clone(),
        }
    }

    pub fn registry(&self) -> &CrawlerRegistry {
        &self.registry
    }

    /// Crawl one ranking and overwrite its snapshot.
    ///
    /// An empty crawl never touches storage, so a bad fetch cannot wipe a
    /// previously good snapshot.
    pub async fn fetch_and_save(&self, site: &str, ranking_type: &str) -> Result<SaveOutcome> {
        let crawler = self.registry.get(site)?;
        let kind = RankingType::from_id(ranking_type)
            .filter(|t| crawler.supports(*t))
            .ok_or_else(|| AppError::unsupported_type(site, ranking_type))?;

        let novels = crawl(crawler.as_ref(), self.fetcher.as_ref(), kind).await?;
        if novels.is_empty() {
            log::warn!("No data for {} - {}, keeping stored snapshot", site, kind);
            return Ok(SaveOutcome::NoData);
        }

        let json = serde_json::to_string(&novels)?;
        let title = snapshot_title(site, kind.as_str());
        let stored = self
            .store
            .replace_novels(site, kind.as_str(), &title, &json)
            .await?;

        log::info!("Saved {} records to '{}'", novels.len(), stored.title);
        Ok(SaveOutcome::Saved {
            count: novels.len(),
        })
    }

    /// Fetch-and-save each pair in order, pausing between attempts.
    ///
    /// A failing pair is logged and counted; it never stops the sweep.
    /// Cancelling `cancel` ends the sweep before the next attempt.
    pub async fn sweep(
        &self,
        pairs: &[(String, RankingType)],
        cancel: &CancellationToken,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        for (i, (site, ranking_type)) in pairs.iter().enumerate() {
            if i > 0 && !self.pace(cancel).await {
                report.cancelled = true;
                break;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            report.attempted += 1;
            match self.fetch_and_save(site, ranking_type.as_str()).await {
                Ok(_) => report.succeeded += 1,
                Err(AppError::Cancelled) => {
                    report.attempted -= 1;
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    log::error!("Fetch failed for {} - {}: {}", site, ranking_type, e);
                    report.failed += 1;
                    report.failures.push(SweepFailure {
                        site: site.clone(),
                        ranking_type: ranking_type.as_str().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if report.cancelled {
            log::warn!(
                "Sweep cancelled after {} of {} pairs",
                report.attempted,
                pairs.len()
            );
        }
        report
    }

    /// Sweep every registered site over the configured ranking types.
    ///
    /// Every site is paired with every type; a type the site does not publish
    /// is counted as a failed pair.
    pub async fn fetch_all(&self, cancel: &CancellationToken) -> SweepReport {
        let pairs: Vec<(String, RankingType)> = self
            .registry
            .supported_sites()
            .into_iter()
            .flat_map(|site| self.sweep_types.iter().map(move |t| (site.clone(), *t)))
            .collect();

        log::info!("Starting full sweep of {} rankings", pairs.len());
        let report = self.sweep(&pairs, cancel).await;
        log::info!(
            "Full sweep finished: {} succeeded, {} failed",
            report.succeeded,
            report.failed
        );
        report
    }

    /// Stored snapshot of one ranking.
    pub async fn get(&self, site: &str, ranking_type: &str) -> Result<RankingData> {
        let stored = self
            .store
            .find(site, ranking_type)
            .await?
            .ok_or_else(|| AppError::not_found(site, ranking_type))?;

        let novels: Vec<NovelRecord> =
            serde_json::from_str(&stored.novels).map_err(|source| {
                AppError::SnapshotDeserializeFailed {
                    site: site.to_string(),
                    ranking_type: ranking_type.to_string(),
                    source,
                }
            })?;

        Ok(RankingData {
            site_name: stored.site_name,
            ranking_type: stored.ranking_type,
            title: stored.title,
            novels,
            updated_at: stored.updated_at,
        })
    }

    /// Summaries of every stored ranking, most recently updated first.
    pub async fn list_summaries(&self) -> Result<Vec<RankingSummary>> {
        let stored = self.store.list_all().await?;
        Ok(stored.into_iter().map(summarize).collect())
    }

    /// Summaries of one site's rankings, most recently updated first.
    pub async fn list_summaries_for_site(&self, site: &str) -> Result<Vec<RankingSummary>> {
        let stored = self.store.find_by_site(site).await?;
        Ok(stored.into_iter().map(summarize).collect())
    }

    /// Pause between sweep attempts; `false` if cancelled while waiting.
    async fn pace(&self, cancel: &CancellationToken) -> bool {
        if self.pacing_delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.pacing_delay) => true,
        }
    }
}

/// Listing view of a snapshot.
///
/// The record list is decoded as strictly as [`RankingService::get`] does; one
/// that fails to decode counts as empty.
fn summarize(stored: StoredRanking) -> RankingSummary {
    let novel_count = match serde_json::from_str::<Vec<NovelRecord>>(&stored.novels) {
        Ok(novels) => novels.len(),
        Err(e) => {
            log::warn!(
                "Snapshot {} - {} has an unreadable record list: {}",
                stored.site_name,
                stored.ranking_type,
                e
            );
            0
        }
    };

    RankingSummary {
        site_name: stored.site_name,
        ranking_type: stored.ranking_type,
        title: stored.title,
        novel_count,
        updated_at: stored.updated_at,
    }
}
