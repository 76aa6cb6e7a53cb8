//! Query embedding for the evidence index.
//!
//! [`FastEmbedder`] runs fastembed's all-MiniLM-L6-v2 model (384 dimensions)
//! locally with ONNX runtime inference. Inference is CPU-bound, so it runs on
//! the blocking pool.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use groundwise_types::error::RetrievalError;

use super::schema::EMBEDDING_DIMENSION;

/// Model name reported by `groundwise check`.
pub const EMBEDDING_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Turns query text into a vector comparable with the indexed chunks.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait TextEmbedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn embed(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<f32>, RetrievalError>> + Send;
}

/// Local fastembed embedder.
///
/// The model handle is shared behind a mutex; clones are cheap.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Load all-MiniLM-L6-v2, downloading it into `cache_dir` on first use.
    pub fn new(cache_dir: PathBuf) -> Result<Self, RetrievalError> {
        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| RetrievalError::Embedding(format!("failed to load model: {e}")))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }

    /// Async wrapper around fastembed inference.
    async fn embed_blocking(&self, text: String) -> Result<Vec<f32>, RetrievalError> {
        let model = Arc::clone(&self.model);
        let mut embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RetrievalError::Embedding("embedding model lock poisoned".into()))?;
            model
                .embed(vec![text], None)
                .map_err(|e| RetrievalError::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| RetrievalError::Embedding(format!("embedding task failed: {e}")))??;

        let vector = embeddings
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("model returned no embedding".into()))?;
        check_dimension(&vector)?;
        Ok(vector)
    }
}

impl TextEmbedder for FastEmbedder {
    fn model_name(&self) -> &str {
        EMBEDDING_MODEL_NAME
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        self.embed_blocking(text.to_string()).await
    }
}

/// Reject vectors that cannot be compared with the indexed ones.
pub fn check_dimension(vector: &[f32]) -> Result<(), RetrievalError> {
    if vector.len() != EMBEDDING_DIMENSION as usize {
        return Err(RetrievalError::Embedding(format!(
            "expected {EMBEDDING_DIMENSION} dimensions, got {}",
            vector.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension(&vec![0.0; 384]).is_ok());
        let err = check_dimension(&[0.0; 3]).unwrap_err();
        assert!(err.to_string().contains("got 3"));
    }
}
