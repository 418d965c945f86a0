// src/models/mod.rs

//! Domain models for the ranking crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod novel;
mod ranking;

// Re-export all public types
pub use config::{Config, CrawlerConfig, DatabaseConfig, IngestConfig, ScheduleConfig};
pub use novel::{
    DESCRIPTION_MAX_CHARS, ELLIPSIS, NovelRecord, NovelStatus, clean_author, truncate_description,
};
pub use ranking::{
    RankingData, RankingSummary, RankingType, site_display_name, snapshot_title,
    type_display_name,
};
