//! Test utilities for database tests.
//!
//! Centralizes test pool creation so every test runs against a real on-disk
//! SQLite database with migrations applied.

use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tempfile::TempDir;

/// Create a test database pool with migrations applied.
///
/// Returns the pool and a TempDir that must be kept alive for the duration
/// of the test.
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .expect("Invalid database URL")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .expect("Failed to create pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    (pool, temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_pool() {
        let (pool, _temp_dir) = create_test_pool().await;

        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shipments")
            .fetch_one(&pool)
            .await
            .expect("Failed to query shipments table");

        assert_eq!(result.0, 0);
    }
}
