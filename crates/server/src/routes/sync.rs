//! Sync subsystem routes: per-mode configuration, test/preview operations,
//! manual triggers, status, logs, and the force-reset escape hatch.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    sync_config::{ConnectionConfig, PASSWORD_MASK, SyncConfig, SyncMode, UpdateSyncConfig},
    sync_log::SyncLogEntry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use services::services::{
    connector::{self, PREVIEW_ROW_LIMIT},
    runner::SyncStatus,
    validator::{self, ValidationReport},
};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

// =====================
// Handlers
// =====================

/// Current configuration for a mode, password masked.
pub async fn get_config(
    State(state): State<AppState>,
    Path(mode): Path<SyncMode>,
) -> Result<ResponseJson<ApiResponse<SyncConfig>>, ApiError> {
    let config = SyncConfig::get_or_default(&state.db().pool, mode).await?;
    Ok(ResponseJson(ApiResponse::success(config.masked())))
}

/// Merge the supplied sections into the stored configuration.
pub async fn update_config(
    State(state): State<AppState>,
    Path(mode): Path<SyncMode>,
    Json(update): Json<UpdateSyncConfig>,
) -> Result<ResponseJson<ApiResponse<SyncConfig>>, ApiError> {
    let config = SyncConfig::save(&state.db().pool, mode, update).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        config.masked(),
        "configuration saved",
    )))
}

/// Reachability probe against the supplied connection parameters.
pub async fn test_connection(
    Json(connection): Json<ConnectionConfig>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    connector::test_connection(&connection).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "connection ok",
    )))
}

#[derive(Debug, Deserialize)]
pub struct TestSqlRequest {
    /// Connection to test against; falls back to the stored one.
    pub connection: Option<ConnectionConfig>,
    /// SQL to preview; falls back to the stored extraction query.
    pub sql: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestSqlResponse {
    pub rows: Vec<Map<String, Value>>,
    pub validation: ValidationReport,
}

/// Preview path: run the SQL (capped sample), validate the shape, and return
/// both. Writes nothing to the domain tables.
pub async fn test_sql(
    State(state): State<AppState>,
    Path(mode): Path<SyncMode>,
    Json(request): Json<TestSqlRequest>,
) -> Result<ResponseJson<ApiResponse<TestSqlResponse>>, ApiError> {
    let stored = SyncConfig::get_or_default(&state.db().pool, mode).await?;

    let mut connection = request.connection.unwrap_or_else(|| stored.connection.clone());
    if connection.password.is_empty() || connection.password == PASSWORD_MASK {
        connection.password = stored.connection.password.clone();
    }
    let sql = request.sql.unwrap_or_else(|| stored.sql.clone());

    let rows = connector::run_query(&connection, &sql, Some(PREVIEW_ROW_LIMIT)).await?;
    let validation = validator::validate(&rows, mode);

    Ok(ResponseJson(ApiResponse::success(TestSqlResponse {
        rows,
        validation,
    })))
}

/// Start an asynchronous sync run; 409 when one is already in flight.
pub async fn sync_now(
    State(state): State<AppState>,
    Path(mode): Path<SyncMode>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.sync().sync_now(mode)?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "sync started",
    )))
}

pub async fn status(
    State(state): State<AppState>,
    Path(mode): Path<SyncMode>,
) -> ResponseJson<ApiResponse<SyncStatus>> {
    ResponseJson(ApiResponse::success(state.sync().status(mode)))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

pub async fn logs(
    State(state): State<AppState>,
    Path(mode): Path<SyncMode>,
    Query(query): Query<LogsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<SyncLogEntry>>>, ApiError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let lines = SyncLogEntry::list(&state.db().pool, mode, limit).await?;
    Ok(ResponseJson(ApiResponse::success(lines)))
}

/// Clear every mode's lock unconditionally. Does not stop an in-flight run;
/// intended for recovery after a crash left a lock held.
pub async fn force_reset(
    State(state): State<AppState>,
) -> ResponseJson<ApiResponse<()>> {
    state.sync().force_reset().await;
    ResponseJson(ApiResponse::success_with_message((), "locks reset"))
}

// =====================
// Router
// =====================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sync/test-connection", post(test_connection))
        .route("/api/sync/force-reset", post(force_reset))
        .route("/api/sync/{mode}/config", get(get_config).put(update_config))
        .route("/api/sync/{mode}/test-sql", post(test_sql))
        .route("/api/sync/{mode}/run", post(sync_now))
        .route("/api/sync/{mode}/status", get(status))
        .route("/api/sync/{mode}/logs", get(logs))
}
