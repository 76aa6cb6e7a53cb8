//! Vector index trait.
//!
//! Defines the interface for nearest-neighbour search over evidence chunks.
//! Implementations (e.g., LanceDB + fastembed) live in groundwise-infra.

use groundwise_types::error::RetrievalError;
use groundwise_types::evidence::IndexHit;

/// Trait for text-in, ranked-hits-out similarity search.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// The index owns query embedding; callers pass plain text.
pub trait VectorIndex: Send + Sync {
    /// Human-readable backend name for logs and `check` output.
    fn name(&self) -> &str;

    /// Return up to `k` hits for `query`, best first.
    ///
    /// Entries may be malformed (missing id, score, or text); the
    /// retriever defaults or drops them.
    fn search(
        &self,
        query: &str,
        k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<IndexHit>, RetrievalError>> + Send;

    /// Number of chunks in the index.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RetrievalError>> + Send;
}
