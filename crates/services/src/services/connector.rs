//! Short-lived connections to the operator-specified external database.
//!
//! Every call opens a fresh MySQL connection, runs exactly one statement, and
//! closes the connection on every exit path. Connections are never pooled:
//! the external database is not ours, and a sync touches it at most a few
//! times a day.

use db::models::sync_config::ConnectionConfig;
use futures_util::TryStreamExt;
use serde_json::{Map, Number, Value};
use sqlx::{
    Column, ConnectOptions, Connection, Row, TypeInfo,
    mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow},
};
use thiserror::Error;

/// Row cap applied to preview (`test-sql`) calls so an operator typo cannot
/// pull an entire table into the response.
pub const PREVIEW_ROW_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("cannot connect to external database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
}

fn connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database)
}

async fn connect(config: &ConnectionConfig) -> Result<MySqlConnection, ConnectorError> {
    connect_options(config)
        .connect()
        .await
        .map_err(ConnectorError::Connection)
}

/// Reachability probe: open a connection, ping, close. No other side effects.
pub async fn test_connection(config: &ConnectionConfig) -> Result<(), ConnectorError> {
    let mut conn = connect(config).await?;
    let ping = conn.ping().await;
    let _ = conn.close().await;
    ping.map_err(ConnectorError::Connection)
}

/// Execute the operator's extraction SQL and materialize the result as JSON
/// objects keyed by column name. `limit` caps the number of rows fetched
/// (used by preview calls); `None` fetches everything.
pub async fn run_query(
    config: &ConnectionConfig,
    sql: &str,
    limit: Option<usize>,
) -> Result<Vec<Map<String, Value>>, ConnectorError> {
    let mut conn = connect(config).await?;
    let result = fetch_rows(&mut conn, sql, limit).await;
    let _ = conn.close().await;
    result
}

async fn fetch_rows(
    conn: &mut MySqlConnection,
    sql: &str,
    limit: Option<usize>,
) -> Result<Vec<Map<String, Value>>, ConnectorError> {
    let mut stream = sqlx::query(sql).fetch(conn);
    let mut rows = Vec::new();

    while let Some(row) = stream.try_next().await.map_err(ConnectorError::Query)? {
        rows.push(row_to_json(&row));
        if limit.is_some_and(|cap| rows.len() >= cap) {
            break;
        }
    }

    Ok(rows)
}

fn row_to_json(row: &MySqlRow) -> Map<String, Value> {
    let mut object = Map::new();
    for column in row.columns() {
        object.insert(
            column.name().to_string(),
            decode_column(row, column.ordinal(), column.type_info().name()),
        );
    }
    object
}

/// Best-effort conversion of a MySQL value to JSON. Unrecognized or
/// driver-specific types fall back to their string form; values that cannot
/// be decoded at all become null and are caught later by row mapping.
fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOLEAN" => match row.try_get::<Option<bool>, _>(idx) {
            Ok(v) => v.map(Value::Bool).unwrap_or(Value::Null),
            Err(_) => string_fallback(row, idx),
        },
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            match row.try_get::<Option<i64>, _>(idx) {
                Ok(v) => v.map(Value::from).unwrap_or(Value::Null),
                Err(_) => string_fallback(row, idx),
            }
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => match row.try_get::<Option<u64>, _>(idx) {
            Ok(v) => v.map(Value::from).unwrap_or(Value::Null),
            Err(_) => string_fallback(row, idx),
        },
        "FLOAT" | "DOUBLE" => match row.try_get::<Option<f64>, _>(idx) {
            Ok(Some(v)) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
            Ok(None) => Value::Null,
            Err(_) => string_fallback(row, idx),
        },
        "DATE" => match row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            Ok(v) => v
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null),
            Err(_) => string_fallback(row, idx),
        },
        "DATETIME" => match row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            Ok(v) => v
                .map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null),
            Err(_) => string_fallback(row, idx),
        },
        "TIMESTAMP" => match row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            Ok(v) => v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null),
            Err(_) => string_fallback(row, idx),
        },
        "JSON" => match row.try_get::<Option<Value>, _>(idx) {
            Ok(v) => v.unwrap_or(Value::Null),
            Err(_) => string_fallback(row, idx),
        },
        // DECIMAL, CHAR/VARCHAR/TEXT, TIME, YEAR, ENUM, SET and anything else.
        _ => string_fallback(row, idx),
    }
}

fn string_fallback(row: &MySqlRow, idx: usize) -> Value {
    match row.try_get_unchecked::<Option<String>, _>(idx) {
        Ok(Some(s)) => Value::String(s),
        _ => Value::Null,
    }
}
