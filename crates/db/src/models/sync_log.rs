use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use super::sync_config::SyncMode;

/// Rows retained per mode. Older lines are deleted as new ones arrive.
const RETAINED_LINES: i64 = 500;

/// One timestamped line in a mode's append-only sync log.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub mode: SyncMode,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl SyncLogEntry {
    /// Append a line to `mode`'s log and enforce the retention cap.
    pub async fn append(
        pool: &SqlitePool,
        mode: SyncMode,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO sync_logs (mode, message, created_at) VALUES ($1, $2, $3)")
            .bind(mode)
            .bind(message)
            .bind(Utc::now())
            .execute(pool)
            .await?;

        sqlx::query(
            "DELETE FROM sync_logs
             WHERE mode = $1
               AND id NOT IN (
                   SELECT id FROM sync_logs WHERE mode = $1 ORDER BY id DESC LIMIT $2
               )",
        )
        .bind(mode)
        .bind(RETAINED_LINES)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Most recent lines first, capped at `limit`.
    pub async fn list(
        pool: &SqlitePool,
        mode: SyncMode,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT id, mode, message, created_at
             FROM sync_logs
             WHERE mode = $1
             ORDER BY id DESC
             LIMIT $2",
        )
        .bind(mode)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    #[tokio::test]
    async fn list_is_newest_first_and_capped() {
        let (pool, _tmp) = create_test_pool().await;

        for i in 0..5 {
            SyncLogEntry::append(&pool, SyncMode::Outbound, &format!("line {i}"))
                .await
                .unwrap();
        }

        let lines = SyncLogEntry::list(&pool, SyncMode::Outbound, 3).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].message, "line 4");
        assert_eq!(lines[2].message, "line 2");
        // Monotonic timestamps in storage order.
        assert!(lines[0].created_at >= lines[2].created_at);
    }

    #[tokio::test]
    async fn logs_are_namespaced_per_mode() {
        let (pool, _tmp) = create_test_pool().await;

        SyncLogEntry::append(&pool, SyncMode::Outbound, "outbound line")
            .await
            .unwrap();

        let inbound = SyncLogEntry::list(&pool, SyncMode::Inbound, 10).await.unwrap();
        assert!(inbound.is_empty());
    }

    #[tokio::test]
    async fn retention_drops_oldest_lines() {
        let (pool, _tmp) = create_test_pool().await;

        for i in 0..(RETAINED_LINES + 20) {
            SyncLogEntry::append(&pool, SyncMode::Inventory, &format!("line {i}"))
                .await
                .unwrap();
        }

        let lines = SyncLogEntry::list(&pool, SyncMode::Inventory, RETAINED_LINES * 2)
            .await
            .unwrap();
        assert_eq!(lines.len() as i64, RETAINED_LINES);
        // The oldest surviving line is line 20.
        assert_eq!(lines.last().unwrap().message, "line 20");
    }
}
