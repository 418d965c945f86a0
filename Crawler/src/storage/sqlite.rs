// src/storage/sqlite.rs

//! SQLite-backed [`RankingStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::{RankingStore, StoredRanking};
use crate::error::Result;

const COLUMNS: &str = "id, site_name, ranking_type, title, novels, updated_at";

#[derive(FromRow)]
struct RankingRow {
    id: i64,
    site_name: String,
    ranking_type: String,
    title: String,
    novels: String,
    updated_at: i64,
}

impl From<RankingRow> for StoredRanking {
    fn from(row: RankingRow) -> Self {
        Self {
            id: row.id,
            site_name: row.site_name,
            ranking_type: row.ranking_type,
            title: row.title,
            novels: row.novels,
            updated_at: DateTime::from_timestamp_millis(row.updated_at).unwrap_or_default(),
        }
    }
}

/// Snapshot store over a sqlx SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteRankingStore {
    pool: SqlitePool,
}

impl SqliteRankingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl RankingStore for SqliteRankingStore {
    async fn find(&self, site: &str, ranking_type: &str) -> Result<Option<StoredRanking>> {
        let row: Option<RankingRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM rankings WHERE site_name = ? AND ranking_type = ?"
        ))
        .bind(site)
        .bind(ranking_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StoredRanking::from))
    }

    async fn find_or_create(
        &self,
        site: &str,
        ranking_type: &str,
        title: &str,
    ) -> Result<StoredRanking> {
        let now = now_ms();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO rankings (site_name, ranking_type, title, novels, created_at, updated_at)
             VALUES (?, ?, ?, '[]', ?, ?)
             ON CONFLICT(site_name, ranking_type) DO NOTHING",
        )
        .bind(site)
        .bind(ranking_type)
        .bind(title)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row: RankingRow = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM rankings WHERE site_name = ? AND ranking_type = ?"
        ))
        .bind(site)
        .bind(ranking_type)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn replace_novels(
        &self,
        site: &str,
        ranking_type: &str,
        title: &str,
        novels_json: &str,
    ) -> Result<StoredRanking> {
        let now = now_ms();
        let row: RankingRow = sqlx::query_as(&format!(
            "INSERT INTO rankings (site_name, ranking_type, title, novels, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(site_name, ranking_type) DO UPDATE SET
                 novels = excluded.novels,
                 updated_at = MAX(excluded.updated_at, rankings.updated_at)
             RETURNING {COLUMNS}"
        ))
        .bind(site)
        .bind(ranking_type)
        .bind(title)
        .bind(novels_json)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        log::debug!("Stored snapshot {} - {} (id {})", site, ranking_type, row.id);
        Ok(row.into())
    }

    async fn find_by_site(&self, site: &str) -> Result<Vec<StoredRanking>> {
        let rows: Vec<RankingRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM rankings WHERE site_name = ?
             ORDER BY updated_at DESC, id DESC"
        ))
        .bind(site)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoredRanking::from).collect())
    }

    async fn list_all(&self) -> Result<Vec<StoredRanking>> {
        let rows: Vec<RankingRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM rankings ORDER BY updated_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoredRanking::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_pool;

    async fn store() -> SqliteRankingStore {
        SqliteRankingStore::new(memory_pool().await)
    }

    async fn row_count(store: &SqliteRankingStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM rankings")
            .fetch_one(store.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn find_missing_is_none() {
        let store = store().await;
        assert!(store.find("qidian", "monthly").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let store = store().await;

        let created = store
            .find_or_create("qidian", "monthly", "起点中文网 - 月票榜")
            .await
            .unwrap();
        assert_eq!(created.novels, "[]");
        assert_eq!(created.title, "起点中文网 - 月票榜");

        let again = store.find_or_create("qidian", "monthly", "other").await.unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.title, "起点中文网 - 月票榜");
        assert_eq!(row_count(&store).await, 1);
    }

    #[tokio::test]
    async fn replace_twice_keeps_one_row_with_latest_records() {
        let store = store().await;

        let first = store
            .replace_novels("zongheng", "click", "纵横中文网 - 点击榜", r#"[{"rank":1}]"#)
            .await
            .unwrap();
        let second = store
            .replace_novels("zongheng", "click", "ignored", r#"[{"rank":1},{"rank":2}]"#)
            .await
            .unwrap();

        assert_eq!(row_count(&store).await, 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.title, "纵横中文网 - 点击榜");
        assert_eq!(second.novels, r#"[{"rank":1},{"rank":2}]"#);
        assert!(second.updated_at >= first.updated_at);

        let found = store.find("zongheng", "click").await.unwrap().unwrap();
        assert_eq!(found, second);
    }

    #[tokio::test]
    async fn listings_are_most_recent_first() {
        let store = store().await;
        store.replace_novels("qidian", "monthly", "a", "[]").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.replace_novels("jjwxc", "click", "b", "[]").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.replace_novels("qidian", "click", "c", "[]").await.unwrap();

        let all: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.site_name, r.ranking_type))
            .collect();
        assert_eq!(
            all,
            vec![
                ("qidian".to_string(), "click".to_string()),
                ("jjwxc".to_string(), "click".to_string()),
                ("qidian".to_string(), "monthly".to_string()),
            ]
        );

        let qidian: Vec<_> = store
            .find_by_site("qidian")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.ranking_type)
            .collect();
        assert_eq!(qidian, vec!["click", "monthly"]);
        assert!(store.find_by_site("17k").await.unwrap().is_empty());
    }
}
