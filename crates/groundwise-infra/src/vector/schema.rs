//! Arrow schema for the LanceDB evidence table.
//!
//! Chunks are written by an external ingestion job; Groundwise only reads
//! them. The vector column holds 384-dimensional all-MiniLM-L6-v2 embeddings.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// all-MiniLM-L6-v2 embedding dimension.
pub const EMBEDDING_DIMENSION: i32 = 384;

pub const CHUNK_ID_COLUMN: &str = "chunk_id";
pub const TEXT_COLUMN: &str = "text";
pub const SECTION_COLUMN: &str = "section";
pub const SOURCE_COLUMN: &str = "source";
pub const VECTOR_COLUMN: &str = "vector";

/// Column LanceDB appends to vector search results.
pub const DISTANCE_COLUMN: &str = "_distance";

/// Schema for the evidence chunks table.
pub fn evidence_chunks_schema() -> Schema {
    Schema::new(vec![
        Field::new(CHUNK_ID_COLUMN, DataType::Utf8, false),
        Field::new(TEXT_COLUMN, DataType::Utf8, false),
        Field::new(SECTION_COLUMN, DataType::Utf8, true),
        Field::new(SOURCE_COLUMN, DataType::Utf8, true),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                EMBEDDING_DIMENSION,
            ),
            false,
        ),
    ])
}
