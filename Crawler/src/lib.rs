// src/lib.rs

//! Novel ranking crawler library.
//!
//! Scrapes the ranking lists of Chinese web-novel sites, keeps the latest
//! snapshot of each (site, ranking type) pair in SQLite, and refreshes the
//! snapshots on a schedule.

pub mod crawlers;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;
