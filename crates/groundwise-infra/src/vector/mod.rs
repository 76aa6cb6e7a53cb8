//! Evidence index infrastructure.
//!
//! Provides the LanceDB-backed [`lance::LanceChunkIndex`] and fastembed-based
//! local query embedding. Arrow schemas define the table structure.

pub mod embedder;
pub mod lance;
pub mod schema;

use std::path::Path;

use groundwise_types::config::IndexConfig;
use groundwise_types::error::RetrievalError;

use crate::filesystem::{resolve_index_path, resolve_model_cache_dir};

use self::embedder::FastEmbedder;
use self::lance::LanceChunkIndex;

/// Open the configured evidence index with the local embedding model.
///
/// The index location is checked before the model is loaded so a missing
/// index fails without a model download.
pub async fn open_evidence_index(
    data_dir: &Path,
    config: &IndexConfig,
) -> Result<LanceChunkIndex<FastEmbedder>, RetrievalError> {
    let path = resolve_index_path(data_dir, config);
    if !path.exists() {
        return Err(RetrievalError::NotConfigured(format!(
            "no index directory at {}",
            path.display()
        )));
    }

    let cache_dir = resolve_model_cache_dir(data_dir, config);
    let embedder = tokio::task::spawn_blocking(move || FastEmbedder::new(cache_dir))
        .await
        .map_err(|e| RetrievalError::Embedding(format!("model loading task failed: {e}")))??;

    LanceChunkIndex::open(&path, &config.table, embedder).await
}
