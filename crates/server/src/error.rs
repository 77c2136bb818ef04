use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::sync_config::SyncConfigError;
use services::services::{connector::ConnectorError, runner::SyncError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Config(#[from] SyncConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Sync(SyncError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            ApiError::Sync(SyncError::NotConfigured(_)) => StatusCode::BAD_REQUEST,
            ApiError::Sync(SyncError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Sync(SyncError::Connector(e)) | ApiError::Connector(e) => match e {
                ConnectorError::Connection(_) => StatusCode::BAD_GATEWAY,
                ConnectorError::Query(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::Config(SyncConfigError::InvalidScheduleTime(_))
            | ApiError::Sync(SyncError::Config(SyncConfigError::InvalidScheduleTime(_))) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use db::models::sync_config::SyncMode;

    use super::*;

    #[test]
    fn contended_run_maps_to_conflict() {
        let err = ApiError::Sync(SyncError::AlreadyRunning(SyncMode::Outbound));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unreachable_external_db_maps_to_bad_gateway() {
        let err = ApiError::Connector(ConnectorError::Connection(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn invalid_schedule_time_maps_to_bad_request() {
        let err = ApiError::Config(SyncConfigError::InvalidScheduleTime("25:00".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
