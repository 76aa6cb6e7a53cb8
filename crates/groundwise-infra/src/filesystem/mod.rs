//! Data directory layout for Groundwise.
//!
//! Everything the CLI persists lives under one data directory:
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   index/             LanceDB evidence index (default [index].path)
//!   sessions/          session_{id}.json (JSON backend)
//!   groundwise.db      sessions table (SQLite backend)
//! ```

use std::path::{Path, PathBuf};

use groundwise_types::config::IndexConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "GROUNDWISE_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `GROUNDWISE_DATA_DIR` environment variable
/// 2. `~/.groundwise`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".groundwise");
    }

    // Last resort: current directory
    PathBuf::from(".groundwise")
}

/// Directory holding one JSON file per session.
pub fn sessions_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("sessions")
}

/// SQLite URL for the session database.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("groundwise.db").display())
}

/// `[index].path`, resolved against the data directory when relative.
pub fn resolve_index_path(data_dir: &Path, index: &IndexConfig) -> PathBuf {
    let path = Path::new(&index.path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

/// Where fastembed caches model weights, unless `[index].model_cache_dir` says otherwise.
pub fn resolve_model_cache_dir(data_dir: &Path, index: &IndexConfig) -> PathBuf {
    match index.model_cache_dir.as_deref() {
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => data_dir.join(dir),
        None => data_dir.join("models"),
    }
}
