// src/storage/mod.rs

//! Snapshot persistence.
//!
//! A snapshot is the latest record list for one (site, ranking type) pair.
//! There is exactly one row per pair; every successful crawl overwrites its
//! record list and bumps `updated_at`. The list is kept as JSON text and only
//! decoded by the service layer.

pub mod sqlite;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::Result;

pub use sqlite::SqliteRankingStore;

/// A stored ranking snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRanking {
    pub id: i64,
    pub site_name: String,
    pub ranking_type: String,
    pub title: String,
    /// JSON array of novel records.
    pub novels: String,
    pub updated_at: DateTime<Utc>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Snapshot for the pair, if one was ever written.
    async fn find(&self, site: &str, ranking_type: &str) -> Result<Option<StoredRanking>>;

    /// Existing snapshot for the pair, or a new one with `title` and no records.
    async fn find_or_create(
        &self,
        site: &str,
        ranking_type: &str,
        title: &str,
    ) -> Result<StoredRanking>;

    /// Overwrite the pair's record list, creating the row with `title` if needed.
    ///
    /// Runs as one atomic statement, so concurrent writers to the same pair
    /// resolve as last-write-wins and never produce a second row.
    async fn replace_novels(
        &self,
        site: &str,
        ranking_type: &str,
        title: &str,
        novels_json: &str,
    ) -> Result<StoredRanking>;

    /// All snapshots of one site, most recently updated first.
    async fn find_by_site(&self, site: &str) -> Result<Vec<StoredRanking>>;

    /// Every snapshot, most recently updated first.
    async fn list_all(&self) -> Result<Vec<StoredRanking>>;
}

/// Open (creating if missing) the database file and apply migrations.
pub async fn init_pool(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    log::info!("Opened ranking database at {}", path.display());

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    run_migrations(&pool).await.expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_pool_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rankings.db");

        let pool = init_pool(&path).await.unwrap();
        assert!(path.exists());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rankings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Reopening an existing database is a no-op for the schema.
        pool.close().await;
        init_pool(&path).await.unwrap();
    }
}
