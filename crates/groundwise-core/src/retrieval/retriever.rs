//! Multi-query evidence retrieval and rank fusion.
//!
//! Each subquery is sent to the index concurrently, but results are consumed
//! in subquery order, so the fused output does not depend on which lookup
//! finished first.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;

use groundwise_types::error::RetrievalError;
use groundwise_types::evidence::{EvidenceChunk, IndexHit};

use super::box_index::BoxVectorIndex;

/// Default number of hits requested per subquery.
pub const DEFAULT_TOP_K: usize = 5;

/// Fans subqueries out to a [`BoxVectorIndex`] and fuses the hits.
#[derive(Clone)]
pub struct EvidenceRetriever {
    index: Arc<BoxVectorIndex>,
    top_k: usize,
}

impl EvidenceRetriever {
    pub fn new(index: Arc<BoxVectorIndex>) -> Self {
        Self {
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve and fuse evidence for every non-empty subquery.
    ///
    /// A lookup that fails is logged and skipped. Only when every lookup
    /// fails is the first error returned.
    #[tracing::instrument(
        name = "retrieve",
        skip(self, subqueries),
        fields(
            index = %self.index.name(),
            subqueries = subqueries.len(),
            top_k = self.top_k,
        )
    )]
    pub async fn retrieve(
        &self,
        subqueries: &[String],
    ) -> Result<Vec<EvidenceChunk>, RetrievalError> {
        let queries: Vec<&str> = subqueries
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect();
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let lookups = queries.iter().map(|q| self.index.search(q, self.top_k));
        let results = join_all(lookups).await;

        let mut batches = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(hits) => batches.push(hits),
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "Subquery lookup failed; skipping");
                    first_error.get_or_insert(e);
                }
            }
        }

        if batches.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let fused = fuse(batches);
        tracing::debug!(chunks = fused.len(), "evidence fused");
        Ok(fused)
    }
}

/// Deduplicate hits by chunk id (first seen wins) and rank by score.
///
/// Hits without an id are dropped. A missing or non-finite score becomes
/// 0.0 and missing text becomes empty. The final sort is stable, so ties
/// keep first-seen order.
pub fn fuse<I>(batches: I) -> Vec<EvidenceChunk>
where
    I: IntoIterator<Item = Vec<IndexHit>>,
{
    let mut seen = HashSet::new();
    let mut chunks = Vec::new();

    for hit in batches.into_iter().flatten() {
        let id = match hit.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let err = RetrievalError::MalformedEntry("entry has no chunk id".to_string());
                tracing::debug!(error = %err, "Dropping index hit");
                continue;
            }
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        chunks.push(EvidenceChunk {
            id,
            section: hit.section,
            source: hit.source,
            score: hit.score.filter(|s| s.is_finite()).unwrap_or(0.0),
            text: hit.text.unwrap_or_default(),
        });
    }

    sort_by_score(&mut chunks);
    chunks
}

/// Union of two evidence rounds: first-round chunks win on id collisions.
pub fn merge_evidence(first: &[EvidenceChunk], second: &[EvidenceChunk]) -> Vec<EvidenceChunk> {
    let mut seen = HashSet::new();
    let mut merged: Vec<EvidenceChunk> = first
        .iter()
        .chain(second)
        .filter(|c| seen.insert(c.id.clone()))
        .cloned()
        .collect();
    sort_by_score(&mut merged);
    merged
}

fn sort_by_score(chunks: &mut [EvidenceChunk]) {
    chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
}
