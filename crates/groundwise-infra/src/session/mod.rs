//! Session store adapters and backend selection.

pub mod json_file;

use std::path::Path;

use groundwise_core::memory::store::BoxSessionStore;
use groundwise_types::config::{StorageBackend, StorageConfig};
use groundwise_types::error::PersistenceError;

use self::json_file::JsonFileSessionStore;
use crate::filesystem::{database_url, sessions_dir};
use crate::sqlite::pool::DatabasePool;
use crate::sqlite::session::SqliteSessionStore;

/// Open the session store selected by `[storage].backend`.
pub async fn open_session_store(
    data_dir: &Path,
    config: &StorageConfig,
) -> Result<BoxSessionStore, PersistenceError> {
    match config.backend {
        StorageBackend::Json => Ok(BoxSessionStore::new(JsonFileSessionStore::new(
            sessions_dir(data_dir),
        ))),
        StorageBackend::Sqlite => {
            tokio::fs::create_dir_all(data_dir).await?;
            let pool = DatabasePool::new(&database_url(data_dir))
                .await
                .map_err(|e| PersistenceError::Io(format!("failed to open session database: {e}")))?;
            Ok(BoxSessionStore::new(SqliteSessionStore::new(pool)))
        }
    }
}
