//! BoxVectorIndex -- object-safe dynamic dispatch wrapper for VectorIndex.
//!
//! Same blanket-impl pattern as BoxLlmProvider:
//! 1. Define an object-safe `VectorIndexDyn` trait with boxed futures
//! 2. Blanket-impl `VectorIndexDyn` for all `T: VectorIndex`
//! 3. `BoxVectorIndex` wraps `Box<dyn VectorIndexDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use groundwise_types::error::RetrievalError;
use groundwise_types::evidence::IndexHit;

use super::index::VectorIndex;

/// Object-safe version of [`VectorIndex`] with boxed futures.
pub trait VectorIndexDyn: Send + Sync {
    fn name(&self) -> &str;

    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexHit>, RetrievalError>> + Send + 'a>>;

    fn count_boxed(&self)
    -> Pin<Box<dyn Future<Output = Result<u64, RetrievalError>> + Send + '_>>;
}

impl<T: VectorIndex> VectorIndexDyn for T {
    fn name(&self) -> &str {
        VectorIndex::name(self)
    }

    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexHit>, RetrievalError>> + Send + 'a>> {
        Box::pin(self.search(query, k))
    }

    fn count_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<u64, RetrievalError>> + Send + '_>> {
        Box::pin(self.count())
    }
}

/// Type-erased vector index for runtime backend selection.
pub struct BoxVectorIndex {
    inner: Box<dyn VectorIndexDyn + Send + Sync>,
}

impl BoxVectorIndex {
    pub fn new<T: VectorIndex + 'static>(index: T) -> Self {
        Self {
            inner: Box::new(index),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<IndexHit>, RetrievalError> {
        self.inner.search_boxed(query, k).await
    }

    pub async fn count(&self) -> Result<u64, RetrievalError> {
        self.inner.count_boxed().await
    }
}
