use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    Error, Executor, Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

pub mod models;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Default maximum connections in the pool.
/// SQLite benefits from limited connections due to single-writer model.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connection acquisition timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Apply performance pragmas to a SQLite connection.
/// Applied on every new connection via `after_connect`.
async fn apply_performance_pragmas(conn: &mut SqliteConnection) -> Result<(), Error> {
    conn.execute("PRAGMA temp_store = 2").await?;
    conn.execute("PRAGMA cache_size = -16000").await?;
    conn.execute("PRAGMA synchronous = NORMAL").await?;
    Ok(())
}

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating if necessary) the database at `db_path`, run migrations,
    /// and return a pooled handle.
    pub async fn new(db_path: &Path) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    apply_performance_pragmas(conn).await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!(path = %db_path.display(), "Database ready");

        Ok(Self { pool })
    }
}
