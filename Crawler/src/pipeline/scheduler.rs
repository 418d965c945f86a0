// src/pipeline/scheduler.rs

//! Background refresh cadences.
//!
//! Three jobs run on local wall-clock cron schedules:
//! - full sweep once a day
//! - one ranking type across a list of sites every hour
//! - the highest-traffic ranking on a short period
//!
//! Each firing runs in its own task; a failing or panicking run is logged and
//! the cron job stays registered. Different cadences may overlap, in which case
//! the later write to a snapshot wins.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::Result;
use crate::models::{RankingType, ScheduleConfig};
use crate::services::{RankingService, SweepReport};

/// When a job fires, in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every day at `hour`:00.
    Daily { hour: u32 },
    /// At every multiple of `minutes` since midnight.
    EveryMinutes { minutes: u32 },
}

impl Cadence {
    /// Six-field cron expression (seconds first).
    ///
    /// `EveryMinutes` expects an interval accepted by
    /// [`ScheduleConfig::is_even_interval`].
    pub fn cron(&self) -> String {
        match *self {
            Cadence::Daily { hour } => format!("0 0 {} * * *", hour.min(23)),
            Cadence::EveryMinutes { minutes: 0 | 1 } => "0 * * * * *".to_string(),
            Cadence::EveryMinutes { minutes } if minutes < 60 => format!("0 */{minutes} * * * *"),
            Cadence::EveryMinutes { minutes } => match minutes / 60 {
                1 => "0 0 * * * *".to_string(),
                hours if hours >= 24 => "0 0 0 * * *".to_string(),
                hours => format!("0 0 */{hours} * * *"),
            },
        }
    }
}

/// The refresh jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    FullSweep,
    HourlyRefresh,
    HotRefresh,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::FullSweep => "full-sweep",
            Job::HourlyRefresh => "hourly-refresh",
            Job::HotRefresh => "hot-refresh",
        }
    }
}

/// Runs the refresh jobs against a [`RankingService`].
pub struct Scheduler {
    service: Arc<RankingService>,
    config: ScheduleConfig,
    runs: TaskTracker,
}

impl Scheduler {
    pub fn new(service: Arc<RankingService>, config: ScheduleConfig) -> Self {
        Self {
            service,
            config,
            runs: TaskTracker::new(),
        }
    }

    /// Every job with its cadence.
    pub fn jobs(&self) -> Vec<(Job, Cadence)> {
        vec![
            (
                Job::FullSweep,
                Cadence::Daily {
                    hour: self.config.daily_hour,
                },
            ),
            (Job::HourlyRefresh, Cadence::EveryMinutes { minutes: 60 }),
            (
                Job::HotRefresh,
                Cadence::EveryMinutes {
                    minutes: self.config.hot_interval_minutes,
                },
            ),
        ]
    }

    /// Run one job to completion.
    pub async fn run_job(&self, job: Job, cancel: &CancellationToken) -> SweepReport {
        match job {
            Job::FullSweep => self.service.fetch_all(cancel).await,
            Job::HourlyRefresh => {
                let pairs: Vec<(String, RankingType)> = self
                    .config
                    .hourly_sites
                    .iter()
                    .map(|site| (site.clone(), self.config.hourly_type))
                    .collect();
                self.service.sweep(&pairs, cancel).await
            }
            Job::HotRefresh => {
                let pairs = [(self.config.hot_site.clone(), self.config.hot_type)];
                self.service.sweep(&pairs, cancel).await
            }
        }
    }

    /// Full sweep on demand, outside any cadence.
    pub async fn manual_fetch_all(&self, cancel: &CancellationToken) -> SweepReport {
        log::info!("Manual full sweep requested");
        self.run_job(Job::FullSweep, cancel).await
    }

    /// One scheduled firing of `job`.
    ///
    /// The run gets its own task, so a panic is reported here as `None`
    /// instead of unwinding into the cron scheduler.
    pub async fn fire(
        self: &Arc<Self>,
        job: Job,
        cancel: &CancellationToken,
    ) -> Option<SweepReport> {
        if cancel.is_cancelled() {
            return None;
        }

        let scheduler = Arc::clone(self);
        let token = cancel.clone();
        let run = self
            .runs
            .spawn(async move { scheduler.run_job(job, &token).await });

        match run.await {
            Ok(report) => {
                log::info!(
                    "{} finished: {} succeeded, {} failed{}",
                    job.name(),
                    report.succeeded,
                    report.failed,
                    if report.cancelled { " (cancelled)" } else { "" }
                );
                Some(report)
            }
            Err(e) => {
                log::error!("{} run aborted: {}", job.name(), e);
                None
            }
        }
    }

    /// Register every cadence with a started cron scheduler.
    ///
    /// Returns `None` when scheduling is disabled. Firings after `cancel`
    /// fires are skipped.
    pub async fn start(
        self: &Arc<Self>,
        cancel: &CancellationToken,
    ) -> Result<Option<JobScheduler>> {
        if !self.config.enabled {
            log::info!("Scheduler disabled");
            return Ok(None);
        }

        let cron = JobScheduler::new().await?;
        for (job, cadence) in self.jobs() {
            let expression = cadence.cron();
            self.register(&cron, job, &expression, cancel).await?;
            log::info!(
                "Scheduled {} ({:?}, cron '{}')",
                job.name(),
                cadence,
                expression
            );
        }
        cron.start().await?;
        Ok(Some(cron))
    }

    async fn register(
        self: &Arc<Self>,
        cron: &JobScheduler,
        job: Job,
        expression: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let scheduler = Arc::clone(self);
        let cancel = cancel.clone();
        let cron_job = CronJob::new_async_tz(expression, Local, move |_id, _lock| {
            let scheduler = Arc::clone(&scheduler);
            let cancel = cancel.clone();
            Box::pin(async move {
                scheduler.fire(job, &cancel).await;
            })
        })?;
        cron.add(cron_job).await?;
        Ok(())
    }

    /// Wait up to `grace` for in-flight runs to finish.
    pub async fn drain(&self, grace: Duration) {
        self.runs.close();
        if tokio::time::timeout(grace, self.runs.wait()).await.is_err() {
            log::warn!(
                "{} scheduled runs still active after {}s, leaving them",
                self.runs.len(),
                grace.as_secs()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::crawlers::{CrawlerRegistry, SiteCrawler};
    use crate::models::IngestConfig;
    use crate::storage::{SqliteRankingStore, memory_pool};
    use crate::test_support::{StaticFetcher, StubCrawler, listing_page};
    use crate::utils::http::PageFetcher;

    /// Panics on its first request, then serves from `inner`.
    struct PanicsOnce {
        tripped: AtomicBool,
        inner: StaticFetcher,
    }

    #[async_trait]
    impl PageFetcher for PanicsOnce {
        async fn fetch(&self, url: &str) -> Result<String> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("first request blows up");
            }
            self.inner.fetch(url).await
        }
    }

    #[test]
    fn cadences_render_as_cron() {
        assert_eq!(Cadence::Daily { hour: 2 }.cron(), "0 0 2 * * *");
        assert_eq!(Cadence::EveryMinutes { minutes: 60 }.cron(), "0 0 * * * *");
        assert_eq!(Cadence::EveryMinutes { minutes: 30 }.cron(), "0 */30 * * * *");
        assert_eq!(Cadence::EveryMinutes { minutes: 1 }.cron(), "0 * * * * *");
        assert_eq!(Cadence::EveryMinutes { minutes: 120 }.cron(), "0 0 */2 * * *");
        assert_eq!(Cadence::EveryMinutes { minutes: 1440 }.cron(), "0 0 0 * * *");
    }

    #[tokio::test]
    async fn default_cadences_are_valid_cron() {
        let (scheduler, _) = scheduler(ScheduleConfig::default(), StaticFetcher::new()).await;
        for (job, cadence) in scheduler.jobs() {
            let built = CronJob::new_async_tz(cadence.cron().as_str(), Local, |_, _| {
                Box::pin(async {})
            });
            assert!(built.is_ok(), "{} has a bad cron expression", job.name());
        }
    }

    async fn scheduler_with(
        config: ScheduleConfig,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Arc<Scheduler> {
        let crawlers: Vec<Arc<dyn SiteCrawler>> =
            vec![Arc::new(StubCrawler::new("a")), Arc::new(StubCrawler::new("b"))];
        let service = RankingService::new(
            CrawlerRegistry::new(crawlers).unwrap(),
            fetcher,
            Arc::new(SqliteRankingStore::new(memory_pool().await)),
            &IngestConfig {
                pacing_delay_ms: 0,
                sweep_types: vec![RankingType::Monthly],
            },
        );
        Arc::new(Scheduler::new(Arc::new(service), config))
    }

    async fn scheduler(
        config: ScheduleConfig,
        fetcher: StaticFetcher,
    ) -> (Arc<Scheduler>, Arc<StaticFetcher>) {
        let fetcher = Arc::new(fetcher);
        (scheduler_with(config, fetcher.clone()).await, fetcher)
    }

    fn hot_on_a() -> ScheduleConfig {
        ScheduleConfig {
            hot_site: "a".into(),
            hot_type: RankingType::Monthly,
            ..ScheduleConfig::default()
        }
    }

    fn panics_once() -> Arc<PanicsOnce> {
        Arc::new(PanicsOnce {
            tripped: AtomicBool::new(false),
            inner: StaticFetcher::new().page(
                &StubCrawler::url("a", RankingType::Monthly),
                &listing_page(&["甲"]),
            ),
        })
    }

    #[tokio::test]
    async fn hourly_job_walks_configured_sites() {
        let config = ScheduleConfig {
            hourly_sites: vec!["a".into(), "missing".into(), "b".into()],
            hourly_type: RankingType::Click,
            ..ScheduleConfig::default()
        };
        let fetcher = StaticFetcher::new()
            .page(&StubCrawler::url("a", RankingType::Click), &listing_page(&["甲"]))
            .page(&StubCrawler::url("b", RankingType::Click), &listing_page(&["乙"]));
        let (scheduler, fetcher) = scheduler(config, fetcher).await;

        let report = scheduler
            .run_job(Job::HourlyRefresh, &CancellationToken::new())
            .await;
        assert_eq!((report.attempted, report.succeeded, report.failed), (3, 2, 1));
        assert_eq!(report.failures[0].site, "missing");
        assert_eq!(
            fetcher.requested(),
            vec!["https://a.test/click", "https://b.test/click"]
        );
    }

    #[tokio::test]
    async fn hot_job_refreshes_one_ranking() {
        let config = ScheduleConfig {
            hot_site: "b".into(),
            hot_type: RankingType::Recommend,
            ..ScheduleConfig::default()
        };
        let fetcher = StaticFetcher::new().page(
            &StubCrawler::url("b", RankingType::Recommend),
            &listing_page(&["乙"]),
        );
        let (scheduler, fetcher) = scheduler(config, fetcher).await;

        let report = scheduler.run_job(Job::HotRefresh, &CancellationToken::new()).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn manual_fetch_all_sweeps_every_site() {
        let fetcher = StaticFetcher::new()
            .page(&StubCrawler::url("a", RankingType::Monthly), &listing_page(&["甲"]));
        let (scheduler, _) = scheduler(ScheduleConfig::default(), fetcher).await;

        let report = scheduler.manual_fetch_all(&CancellationToken::new()).await;
        assert_eq!((report.attempted, report.succeeded, report.failed), (2, 1, 1));
    }

    #[tokio::test]
    async fn panicking_run_does_not_stop_the_next_firing() {
        let scheduler = scheduler_with(hot_on_a(), panics_once()).await;
        let cancel = CancellationToken::new();

        assert!(scheduler.fire(Job::HotRefresh, &cancel).await.is_none());

        let report = scheduler.fire(Job::HotRefresh, &cancel).await.unwrap();
        assert_eq!((report.succeeded, report.failed), (1, 0));
        assert!(scheduler.service.get("a", "monthly").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cron_keeps_firing_after_a_panicking_run() {
        let scheduler = scheduler_with(hot_on_a(), panics_once()).await;
        let cancel = CancellationToken::new();

        let mut cron = JobScheduler::new().await.unwrap();
        scheduler
            .register(&cron, Job::HotRefresh, "* * * * * *", &cancel)
            .await
            .unwrap();
        cron.start().await.unwrap();

        let saved = tokio::time::timeout(Duration::from_secs(10), async {
            while scheduler.service.get("a", "monthly").await.is_err() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        cancel.cancel();
        cron.shutdown().await.unwrap();
        scheduler.drain(Duration::from_secs(1)).await;
        assert!(saved.is_ok(), "no firing succeeded after the panic");
    }

    #[tokio::test]
    async fn cancelled_firing_is_skipped() {
        let (scheduler, fetcher) = scheduler(hot_on_a(), StaticFetcher::new()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(scheduler.fire(Job::HotRefresh, &cancel).await.is_none());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn started_scheduler_shuts_down_without_firing() {
        let (scheduler, fetcher) =
            scheduler(ScheduleConfig::default(), StaticFetcher::new()).await;
        let cancel = CancellationToken::new();

        let mut cron = scheduler.start(&cancel).await.unwrap().unwrap();
        cancel.cancel();
        cron.shutdown().await.unwrap();
        scheduler.drain(Duration::from_secs(1)).await;
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn disabled_scheduler_starts_nothing() {
        let config = ScheduleConfig {
            enabled: false,
            ..ScheduleConfig::default()
        };
        let (scheduler, _) = scheduler(config, StaticFetcher::new()).await;
        assert!(scheduler.start(&CancellationToken::new()).await.unwrap().is_none());
    }
}
