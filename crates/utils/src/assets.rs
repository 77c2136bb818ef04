use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

pub fn asset_dir() -> PathBuf {
    let path = if let Ok(dir) = std::env::var("SL_ASSET_DIR") {
        PathBuf::from(dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("io", "stockline", "stockline")
            .expect("OS didn't give us a home directory")
            .data_dir()
            .to_path_buf()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).expect("Failed to create asset directory");
    }

    path
}

/// Get the database file path.
///
/// Respects the `SL_DATABASE_PATH` environment variable for custom locations.
///
/// Default: `{asset_dir}/db.sqlite`
pub fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var("SL_DATABASE_PATH") {
        return PathBuf::from(path);
    }
    asset_dir().join("db.sqlite")
}

/// Get the log directory path.
///
/// Respects the `SL_LOG_DIR` environment variable for custom locations.
///
/// Default: `{asset_dir}/logs`
pub fn log_dir() -> PathBuf {
    if let Ok(path) = std::env::var("SL_LOG_DIR") {
        return PathBuf::from(path);
    }
    asset_dir().join("logs")
}
