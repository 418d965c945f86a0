// src/error.rs

//! Unified error handling for the ranking crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No crawler is registered under the requested site identifier
    #[error("Unsupported site '{site}' (supported sites: {})", .supported.join(", "))]
    UnsupportedSite { site: String, supported: Vec<String> },

    /// The site exists but does not publish the requested ranking
    #[error("Site '{site}' does not support ranking type '{ranking_type}'")]
    UnsupportedRankingType { site: String, ranking_type: String },

    /// Every fetch attempt failed
    #[error("Request to {url} failed after {attempts} attempts")]
    FetchRetryExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    /// No records could be obtained and no fallback dataset exists
    #[error("Crawl failed for {site} - {ranking_type}")]
    CrawlFailed {
        site: String,
        ranking_type: String,
        #[source]
        source: Box<AppError>,
    },

    /// The (site, type) pair has never been stored
    #[error("No ranking stored for {site} - {ranking_type}")]
    RankingNotFound { site: String, ranking_type: String },

    /// The stored record list is not a valid JSON array of novels
    #[error("Stored ranking {site} - {ranking_type} could not be decoded")]
    SnapshotDeserializeFailed {
        site: String,
        ranking_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Page is a bot-challenge interstitial instead of the ranking
    #[error("Anti-bot interstitial detected at {url} (marker: {marker})")]
    AntiBotInterstitial { url: String, marker: String },

    /// Work was aborted by a shutdown signal
    #[error("Operation cancelled")]
    Cancelled,

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Cron scheduler could not be built or driven
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unsupported-ranking-type error.
    pub fn unsupported_type(site: impl Into<String>, ranking_type: impl Into<String>) -> Self {
        Self::UnsupportedRankingType {
            site: site.into(),
            ranking_type: ranking_type.into(),
        }
    }

    /// Create a not-found error for a (site, type) pair.
    pub fn not_found(site: impl Into<String>, ranking_type: impl Into<String>) -> Self {
        Self::RankingNotFound {
            site: site.into(),
            ranking_type: ranking_type.into(),
        }
    }

    /// Whether the error comes from the caller asking for something that does not exist.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSite { .. }
                | Self::UnsupportedRankingType { .. }
                | Self::RankingNotFound { .. }
        )
    }
}
