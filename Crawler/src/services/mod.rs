//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Crawling a ranking and storing its snapshot (`RankingService::fetch_and_save`)
//! - Sweeping many rankings with pacing (`RankingService::sweep`)
//! - Reading snapshots and summaries back (`RankingService::get`)

mod rankings;

pub use rankings::{RankingService, SaveOutcome, SweepFailure, SweepReport};
