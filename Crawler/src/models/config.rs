// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::RankingType;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetch and retry behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Fetch-and-store cycle settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Background cadences
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Snapshot database location
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_attempts == 0 {
            return Err(AppError::validation("crawler.max_attempts must be > 0"));
        }
        if self.crawler.max_body_bytes == 0 {
            return Err(AppError::validation("crawler.max_body_bytes must be > 0"));
        }
        if self.crawler.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("crawler.user_agents is empty"));
        }
        if self.ingest.sweep_types.is_empty() {
            return Err(AppError::validation("ingest.sweep_types is empty"));
        }
        if self.schedule.daily_hour > 23 {
            return Err(AppError::validation("schedule.daily_hour must be 0-23"));
        }
        if !ScheduleConfig::is_even_interval(self.schedule.hot_interval_minutes) {
            return Err(AppError::validation(
                "schedule.hot_interval_minutes must divide an hour or a day",
            ));
        }
        if self.schedule.hourly_sites.is_empty() {
            return Err(AppError::validation("schedule.hourly_sites is empty"));
        }
        if self.schedule.hot_site.trim().is_empty() {
            return Err(AppError::validation("schedule.hot_site is empty"));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(AppError::validation("database.path is empty"));
        }
        Ok(())
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Pool of User-Agent strings, one picked at random per attempt
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Per-attempt timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Attempts per page before giving up
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base of the exponential backoff in milliseconds
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,

    /// Upper bound of the random jitter added to each backoff
    #[serde(default = "defaults::backoff_jitter")]
    pub backoff_jitter_ms: u64,

    /// Response bodies are truncated beyond this size
    #[serde(default = "defaults::max_body_bytes")]
    pub max_body_bytes: usize,

    /// Accept-Language header value
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::user_agents(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            backoff_base_ms: defaults::backoff_base(),
            backoff_jitter_ms: defaults::backoff_jitter(),
            max_body_bytes: defaults::max_body_bytes(),
            accept_language: defaults::accept_language(),
        }
    }
}

/// Fetch-and-store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Pause between consecutive fetches of a sweep, in milliseconds
    #[serde(default = "defaults::pacing_delay")]
    pub pacing_delay_ms: u64,

    /// Ranking types walked by a full sweep, in order
    #[serde(default = "defaults::sweep_types")]
    pub sweep_types: Vec<RankingType>,
}

impl IngestConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: defaults::pacing_delay(),
            sweep_types: defaults::sweep_types(),
        }
    }
}

/// Cadence settings for the background scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run cadences at all when serving
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Local hour of the daily full sweep
    #[serde(default = "defaults::daily_hour")]
    pub daily_hour: u32,

    /// Sites refreshed every hour; may name sites without a crawler
    #[serde(default = "defaults::hourly_sites")]
    pub hourly_sites: Vec<String>,

    /// Ranking refreshed every hour on each of `hourly_sites`
    #[serde(default = "defaults::hourly_type")]
    pub hourly_type: RankingType,

    /// Site of the highest-traffic ranking
    #[serde(default = "defaults::hot_site")]
    pub hot_site: String,

    /// Type of the highest-traffic ranking
    #[serde(default = "defaults::hot_type")]
    pub hot_type: RankingType,

    /// Refresh period of the highest-traffic ranking, in minutes
    #[serde(default = "defaults::hot_interval")]
    pub hot_interval_minutes: u32,
}

impl ScheduleConfig {
    /// Whether `minutes` repeats on the same clock positions every day.
    pub fn is_even_interval(minutes: u32) -> bool {
        match minutes {
            0 => false,
            1..60 => 60 % minutes == 0,
            _ => minutes % 60 == 0 && 24 % (minutes / 60) == 0,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            daily_hour: defaults::daily_hour(),
            hourly_sites: defaults::hourly_sites(),
            hourly_type: defaults::hourly_type(),
            hot_site: defaults::hot_site(),
            hot_type: defaults::hot_type(),
            hot_interval_minutes: defaults::hot_interval(),
        }
    }
}

/// Snapshot database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, created on first start
    #[serde(default = "defaults::database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: defaults::database_path(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::RankingType;

    // Crawler defaults
    pub fn user_agents() -> Vec<String> {
        [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff_base() -> u64 {
        1000
    }
    pub fn backoff_jitter() -> u64 {
        2000
    }
    pub fn max_body_bytes() -> usize {
        10 * 1024 * 1024
    }
    pub fn accept_language() -> String {
        "zh-CN,zh;q=0.9,en;q=0.8".into()
    }

    // Ingest defaults
    pub fn pacing_delay() -> u64 {
        2000
    }
    pub fn sweep_types() -> Vec<RankingType> {
        RankingType::STANDARD.to_vec()
    }

    // Schedule defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn daily_hour() -> u32 {
        2
    }
    pub fn hourly_sites() -> Vec<String> {
        ["qidian", "zongheng", "jjwxc", "17k", "fanqie"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn hourly_type() -> RankingType {
        RankingType::Click
    }
    pub fn hot_site() -> String {
        "qidian".into()
    }
    pub fn hot_type() -> RankingType {
        RankingType::Monthly
    }
    pub fn hot_interval() -> u32 {
        30
    }

    // Database defaults
    pub fn database_path() -> PathBuf {
        PathBuf::from("data/rankings.db")
    }
}
