use std::net::Ipv4Addr;

use anyhow::Error as AnyhowError;
use db::DBService;
use server::{AppState, logging, routes};
use services::services::scheduler::{SyncScheduler, SyncSchedulerHandle};
use sqlx::Error as SqlxError;
use thiserror::Error;
use utils::assets::{asset_dir, database_path};

#[derive(Debug, Error)]
pub enum StocklineError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), StocklineError> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    // The guard must be held for the lifetime of the application to ensure
    // logs are flushed
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _file_log_guard = logging::init_logging(&log_level);

    if !asset_dir().exists() {
        std::fs::create_dir_all(asset_dir())?;
    }

    let db = DBService::new(&database_path()).await?;
    let state = AppState::new(db);

    let scheduler = SyncScheduler::spawn_default(state.sync().clone());

    let app = routes::router(state);

    let port = std::env::var("SL_PORT")
        .or_else(|_| std::env::var("PORT"))
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8010);

    let listener = tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    tracing::info!(
        port,
        scheduled_syncs = scheduler.is_enabled(),
        "Stockline sync server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await?;

    Ok(())
}

async fn shutdown_signal(scheduler: SyncSchedulerHandle) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
    // Stops future triggers; an in-flight run is left to finish.
    scheduler.shutdown().await;
}
