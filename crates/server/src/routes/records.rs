//! Read-only listings of the local domain tables the sync subsystem writes.

use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{inventory::InventoryLevel, receipt::Receipt, shipment::Shipment};
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }
}

pub async fn list_outbound(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Shipment>>>, ApiError> {
    let rows = Shipment::find_recent(&state.db().pool, query.limit()).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn list_inbound(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Receipt>>>, ApiError> {
    let rows = Receipt::find_recent(&state.db().pool, query.limit()).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<InventoryLevel>>>, ApiError> {
    let rows = InventoryLevel::find_all(&state.db().pool, query.limit()).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/outbound", get(list_outbound))
        .route("/api/inbound", get(list_inbound))
        .route("/api/inventory", get(list_inventory))
}
