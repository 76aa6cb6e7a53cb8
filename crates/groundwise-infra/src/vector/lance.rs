//! LanceDB-backed evidence index.
//!
//! Implements [`VectorIndex`] from `groundwise-core` over a pre-built LanceDB
//! table of policy chunks. Queries are embedded with a [`TextEmbedder`] and
//! searched by cosine distance; `score = 1 - distance`.

use std::path::{Path, PathBuf};

use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};

use groundwise_core::retrieval::index::VectorIndex;
use groundwise_types::error::RetrievalError;
use groundwise_types::evidence::IndexHit;

use super::embedder::TextEmbedder;
use super::schema::{
    CHUNK_ID_COLUMN, DISTANCE_COLUMN, SECTION_COLUMN, SOURCE_COLUMN, TEXT_COLUMN,
};

/// Evidence index over one LanceDB table.
pub struct LanceChunkIndex<E> {
    table: lancedb::Table,
    embedder: E,
    name: String,
    path: PathBuf,
}

impl<E: TextEmbedder> LanceChunkIndex<E> {
    /// Open `table_name` in the LanceDB database at `path`.
    ///
    /// A missing directory or table is [`RetrievalError::NotConfigured`]:
    /// the index is built outside Groundwise and must exist before the
    /// first question.
    pub async fn open(path: &Path, table_name: &str, embedder: E) -> Result<Self, RetrievalError> {
        if !path.exists() {
            return Err(RetrievalError::NotConfigured(format!(
                "no index directory at {}",
                path.display()
            )));
        }

        let uri = path.to_str().ok_or_else(|| {
            RetrievalError::NotConfigured(format!(
                "Path contains invalid UTF-8: {}",
                path.display()
            ))
        })?;

        let db = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("failed to open index: {e}")))?;

        let table = match db.open_table(table_name).execute().await {
            Ok(table) => table,
            Err(lancedb::Error::TableNotFound { .. }) => {
                return Err(RetrievalError::NotConfigured(format!(
                    "table '{table_name}' not found in {}",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(RetrievalError::Unavailable(format!(
                    "failed to open table '{table_name}': {e}"
                )));
            }
        };

        tracing::debug!(
            path = %path.display(),
            table = table_name,
            embedder = embedder.model_name(),
            "evidence index opened"
        );

        Ok(Self {
            table,
            embedder,
            name: format!("lancedb:{table_name}"),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }
}

impl<E: TextEmbedder> VectorIndex for LanceChunkIndex<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<IndexHit>, RetrievalError> {
        let embedding = self.embedder.embed(query).await?;

        let results = self
            .table
            .vector_search(embedding)
            .map_err(|e| RetrievalError::Unavailable(format!("Vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("Vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("Failed to collect results: {e}")))?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(record_batch_to_hits(batch));
        }
        Ok(hits)
    }

    async fn count(&self) -> Result<u64, RetrievalError> {
        let count = self
            .table
            .count_rows(None)
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("Failed to count rows: {e}")))?;
        Ok(count as u64)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
}

fn string_value(column: Option<&StringArray>, row: usize) -> Option<String> {
    column
        .filter(|c| !c.is_null(row))
        .map(|c| c.value(row).to_string())
}

/// Parse search result rows into hits.
///
/// Columns are looked up by name; a missing or null column leaves the
/// field empty so the retriever can default or drop the entry.
fn record_batch_to_hits(batch: &RecordBatch) -> Vec<IndexHit> {
    let chunk_ids = string_column(batch, CHUNK_ID_COLUMN);
    let texts = string_column(batch, TEXT_COLUMN);
    let sections = string_column(batch, SECTION_COLUMN);
    let sources = string_column(batch, SOURCE_COLUMN);
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    (0..batch.num_rows())
        .map(|row| IndexHit {
            id: string_value(chunk_ids, row),
            section: string_value(sections, row),
            source: string_value(sources, row),
            score: distances
                .filter(|d| !d.is_null(row))
                .map(|d| 1.0 - d.value(row)),
            text: string_value(texts, row),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::{FixedSizeListArray, RecordBatchIterator};
    use arrow_schema::{DataType, Field};

    use super::*;
    use crate::vector::schema::{EMBEDDING_DIMENSION, evidence_chunks_schema};

    /// One-hot embedder over a fixed vocabulary, so similarity is exact.
    struct KeywordEmbedder;

    const VOCAB: &[&str] = &["liquids", "saline", "batteries", "pets"];

    fn keyword_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector = vec![0.0; EMBEDDING_DIMENSION as usize];
        for (i, word) in VOCAB.iter().enumerate() {
            if lower.contains(word) {
                vector[i] = 1.0;
            }
        }
        // Keep every vector non-zero for cosine distance.
        vector[EMBEDDING_DIMENSION as usize - 1] = 0.01;
        vector
    }

    impl TextEmbedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
            Ok(keyword_vector(text))
        }
    }

    async fn seed_table(path: &Path, rows: &[(&str, &str, Option<&str>)]) {
        let db = lancedb::connect(path.to_str().unwrap())
            .execute()
            .await
            .unwrap();
        let schema = Arc::new(evidence_chunks_schema());

        let values: Vec<f32> = rows.iter().flat_map(|(_, text, _)| keyword_vector(text)).collect();
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vectors = FixedSizeListArray::new(
            field,
            EMBEDDING_DIMENSION,
            Arc::new(Float32Array::from(values)),
            None,
        );

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
                Arc::new(StringArray::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())),
                Arc::new(StringArray::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
                Arc::new(StringArray::from(vec![Some("policy.md"); rows.len()])),
                Arc::new(vectors),
            ],
        )
        .unwrap();

        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        db.create_table("chunks", reader).execute().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_directory_is_not_configured() {
        let tmp = tempfile::tempdir().unwrap();
        let result = LanceChunkIndex::open(&tmp.path().join("nope"), "chunks", KeywordEmbedder).await;
        assert!(matches!(result, Err(RetrievalError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_open_missing_table_is_not_configured() {
        let tmp = tempfile::tempdir().unwrap();
        let result = LanceChunkIndex::open(tmp.path(), "chunks", KeywordEmbedder).await;
        match result {
            Err(err @ RetrievalError::NotConfigured(_)) => {
                assert!(err.to_string().contains("chunks"));
                assert!(err.remediation().is_some());
            }
            Err(other) => panic!("expected NotConfigured, got {other}"),
            Ok(_) => panic!("expected NotConfigured, got Ok"),
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_cosine_similarity() {
        let tmp = tempfile::tempdir().unwrap();
        seed_table(
            tmp.path(),
            &[
                ("c1", "Liquids over 100ml are not allowed.", Some("Liquids")),
                ("c2", "Saline and other medical liquids are exempt.", None),
                ("c3", "Spare batteries must be carried on.", Some("Batteries")),
            ],
        )
        .await;

        let index = LanceChunkIndex::open(tmp.path(), "chunks", KeywordEmbedder)
            .await
            .unwrap();
        assert_eq!(index.name(), "lancedb:chunks");
        assert_eq!(index.count().await.unwrap(), 3);

        let hits = index.search("saline liquids", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id.as_deref(), Some("c2"));
        assert_eq!(hits[0].section, None);
        assert_eq!(hits[0].source.as_deref(), Some("policy.md"));
        assert_eq!(hits[1].id.as_deref(), Some("c1"));
        assert_eq!(hits[1].section.as_deref(), Some("Liquids"));

        let top = hits[0].score.unwrap();
        let second = hits[1].score.unwrap();
        assert!(top > second);
        assert!(top > 0.99 && top <= 1.0 + f32::EPSILON);
    }

    #[test]
    fn test_record_batch_without_distance_leaves_score_empty() {
        let schema = Arc::new(arrow_schema::Schema::new(vec![
            Field::new(CHUNK_ID_COLUMN, DataType::Utf8, true),
            Field::new(TEXT_COLUMN, DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("c1"), None])),
                Arc::new(StringArray::from(vec![Some("text"), Some("orphan")])),
            ],
        )
        .unwrap();

        let hits = record_batch_to_hits(&batch);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id.as_deref(), Some("c1"));
        assert_eq!(hits[0].score, None);
        assert_eq!(hits[1].id, None);
        assert_eq!(hits[1].section, None);
    }
}
