use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

/// Sentinel returned instead of the stored password on config reads. A save
/// carrying this value (or an empty string) keeps the stored secret.
pub const PASSWORD_MASK: &str = "******";

/// Default MySQL port used when a config has never been saved.
pub const DEFAULT_EXTERNAL_PORT: u16 = 3306;

/// The three independent data domains the sync subsystem services. Each mode
/// has its own config row, lock, and log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SyncMode {
    Outbound,
    Inbound,
    Inventory,
}

impl SyncMode {
    pub const ALL: [SyncMode; 3] = [SyncMode::Outbound, SyncMode::Inbound, SyncMode::Inventory];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Outbound => "outbound",
            SyncMode::Inbound => "inbound",
            SyncMode::Inventory => "inventory",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outbound" => Ok(SyncMode::Outbound),
            "inbound" => Ok(SyncMode::Inbound),
            "inventory" => Ok(SyncMode::Inventory),
            other => Err(format!("unknown sync mode '{other}'")),
        }
    }
}

/// Connection parameters for the operator-specified external database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

fn default_port() -> u16 {
    DEFAULT_EXTERNAL_PORT
}

/// Full per-mode sync configuration: connection + extraction SQL + daily
/// schedule. One row per mode.
#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    pub mode: SyncMode,
    pub connection: ConnectionConfig,
    pub sql: String,
    /// Sorted, de-duplicated `HH:mm` times.
    pub schedule: Vec<String>,
}

/// Partial update: only the supplied sections are merged into the stored row.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSyncConfig {
    pub connection: Option<ConnectionConfig>,
    pub sql: Option<String>,
    pub schedule: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum SyncConfigError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid schedule time '{0}', expected HH:mm")]
    InvalidScheduleTime(String),
}

#[derive(Debug, FromRow)]
struct SyncConfigRow {
    host: String,
    port: i64,
    username: String,
    password: String,
    database_name: String,
    sql: String,
    schedule: String,
}

impl SyncConfig {
    /// Documented defaults for a mode that has never been saved: empty
    /// connection fields, port 3306, empty SQL, empty schedule.
    pub fn default_for(mode: SyncMode) -> Self {
        Self {
            mode,
            connection: ConnectionConfig {
                host: String::new(),
                port: DEFAULT_EXTERNAL_PORT,
                username: String::new(),
                password: String::new(),
                database: String::new(),
            },
            sql: String::new(),
            schedule: Vec::new(),
        }
    }

    /// A mode is runnable once it has at least a host and an extraction query.
    pub fn is_configured(&self) -> bool {
        !self.connection.host.is_empty() && !self.sql.trim().is_empty()
    }

    /// Copy with the password replaced by [`PASSWORD_MASK`] (when non-empty),
    /// for returning to the API without echoing the secret.
    pub fn masked(mut self) -> Self {
        if !self.connection.password.is_empty() {
            self.connection.password = PASSWORD_MASK.to_string();
        }
        self
    }

    pub async fn get_or_default(pool: &SqlitePool, mode: SyncMode) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, SyncConfigRow>(
            "SELECT host, port, username, password, database_name, sql, schedule
             FROM sync_configs WHERE mode = $1",
        )
        .bind(mode)
        .fetch_optional(pool)
        .await?;

        Ok(match row {
            Some(row) => Self {
                mode,
                connection: ConnectionConfig {
                    host: row.host,
                    port: row.port as u16,
                    username: row.username,
                    password: row.password,
                    database: row.database_name,
                },
                sql: row.sql,
                schedule: serde_json::from_str(&row.schedule).unwrap_or_default(),
            },
            None => Self::default_for(mode),
        })
    }

    /// Merge `update` into the stored config for `mode` and persist the
    /// result. Sections absent from `update` are left untouched; a masked or
    /// empty password keeps the stored secret.
    pub async fn save(
        pool: &SqlitePool,
        mode: SyncMode,
        update: UpdateSyncConfig,
    ) -> Result<Self, SyncConfigError> {
        let mut config = Self::get_or_default(pool, mode).await?;

        if let Some(conn) = update.connection {
            let stored_password = std::mem::take(&mut config.connection.password);
            config.connection = conn;
            if config.connection.password.is_empty() || config.connection.password == PASSWORD_MASK
            {
                config.connection.password = stored_password;
            }
        }
        if let Some(sql) = update.sql {
            config.sql = sql;
        }
        if let Some(schedule) = update.schedule {
            config.schedule = normalize_schedule(schedule)?;
        }

        let schedule_json =
            serde_json::to_string(&config.schedule).expect("schedule serializes to JSON");

        sqlx::query(
            "INSERT INTO sync_configs (mode, host, port, username, password, database_name, sql, schedule, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT(mode) DO UPDATE SET
                 host = excluded.host,
                 port = excluded.port,
                 username = excluded.username,
                 password = excluded.password,
                 database_name = excluded.database_name,
                 sql = excluded.sql,
                 schedule = excluded.schedule,
                 updated_at = excluded.updated_at",
        )
        .bind(mode)
        .bind(&config.connection.host)
        .bind(config.connection.port as i64)
        .bind(&config.connection.username)
        .bind(&config.connection.password)
        .bind(&config.connection.database)
        .bind(&config.sql)
        .bind(&schedule_json)
        .bind(Utc::now())
        .execute(pool)
        .await
        .map_err(SyncConfigError::Sqlx)?;

        Ok(config)
    }
}

/// Validate `HH:mm` entries, drop duplicates, and sort. Entries are stored in
/// the zero-padded canonical form the scheduler matches against, so `"6:00"`
/// becomes `"06:00"`. Adding an already present time is a no-op.
pub fn normalize_schedule(times: Vec<String>) -> Result<Vec<String>, SyncConfigError> {
    let mut normalized: Vec<String> = Vec::with_capacity(times.len());
    for time in times {
        let time = time.trim();
        let parsed = NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| SyncConfigError::InvalidScheduleTime(time.to_string()))?;
        let canonical = parsed.format("%H:%M").to_string();
        if !normalized.contains(&canonical) {
            normalized.push(canonical);
        }
    }
    normalized.sort();
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    fn connection(host: &str, password: &str) -> ConnectionConfig {
        ConnectionConfig {
            host: host.to_string(),
            port: 3307,
            username: "etl".to_string(),
            password: password.to_string(),
            database: "legacy".to_string(),
        }
    }

    #[test]
    fn schedule_rejects_malformed_times() {
        assert!(normalize_schedule(vec!["24:00".to_string()]).is_err());
        assert!(normalize_schedule(vec!["8am".to_string()]).is_err());
    }

    #[test]
    fn schedule_zero_pads_to_canonical_form() {
        // chrono parses "6:00", but the scheduler compares against the
        // zero-padded current minute, so the stored form must be "06:00".
        let normalized = normalize_schedule(vec!["6:00".to_string(), "6:5".to_string()]).unwrap();
        assert_eq!(normalized, vec!["06:00", "06:05"]);

        // Padded and unpadded spellings of the same time collapse to one entry.
        let normalized =
            normalize_schedule(vec!["6:00".to_string(), "06:00".to_string()]).unwrap();
        assert_eq!(normalized, vec!["06:00"]);
    }

    #[test]
    fn schedule_dedupes_and_sorts() {
        let times = vec![
            "18:30".to_string(),
            "06:00".to_string(),
            "18:30".to_string(),
        ];
        let normalized = normalize_schedule(times).unwrap();
        assert_eq!(normalized, vec!["06:00", "18:30"]);
    }

    #[tokio::test]
    async fn get_returns_documented_defaults_when_unsaved() {
        let (pool, _tmp) = create_test_pool().await;
        let config = SyncConfig::get_or_default(&pool, SyncMode::Outbound)
            .await
            .unwrap();
        assert_eq!(config.connection.port, DEFAULT_EXTERNAL_PORT);
        assert!(config.connection.host.is_empty());
        assert!(config.schedule.is_empty());
        assert!(!config.is_configured());
    }

    #[tokio::test]
    async fn save_merges_only_supplied_sections() {
        let (pool, _tmp) = create_test_pool().await;

        SyncConfig::save(
            &pool,
            SyncMode::Outbound,
            UpdateSyncConfig {
                connection: Some(connection("legacy.example", "hunter2")),
                sql: Some("SELECT 1".to_string()),
                schedule: None,
            },
        )
        .await
        .unwrap();

        // Updating only the schedule must not reset connection or SQL.
        let config = SyncConfig::save(
            &pool,
            SyncMode::Outbound,
            UpdateSyncConfig {
                schedule: Some(vec!["02:00".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(config.connection.host, "legacy.example");
        assert_eq!(config.sql, "SELECT 1");
        assert_eq!(config.schedule, vec!["02:00"]);
        assert!(config.is_configured());
    }

    #[tokio::test]
    async fn masked_password_save_keeps_stored_secret() {
        let (pool, _tmp) = create_test_pool().await;

        SyncConfig::save(
            &pool,
            SyncMode::Inbound,
            UpdateSyncConfig {
                connection: Some(connection("legacy.example", "hunter2")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // UI round-trips the mask back on an unrelated edit.
        SyncConfig::save(
            &pool,
            SyncMode::Inbound,
            UpdateSyncConfig {
                connection: Some(connection("legacy2.example", PASSWORD_MASK)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let config = SyncConfig::get_or_default(&pool, SyncMode::Inbound)
            .await
            .unwrap();
        assert_eq!(config.connection.host, "legacy2.example");
        assert_eq!(config.connection.password, "hunter2");

        let masked = config.masked();
        assert_eq!(masked.connection.password, PASSWORD_MASK);
    }

    #[tokio::test]
    async fn modes_are_stored_independently() {
        let (pool, _tmp) = create_test_pool().await;

        SyncConfig::save(
            &pool,
            SyncMode::Outbound,
            UpdateSyncConfig {
                sql: Some("SELECT out".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let inbound = SyncConfig::get_or_default(&pool, SyncMode::Inbound)
            .await
            .unwrap();
        assert!(inbound.sql.is_empty());
    }
}
