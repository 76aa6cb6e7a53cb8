//! Evidence retrieval for Groundwise.
//!
//! `VectorIndex` is the port the infrastructure layer implements;
//! `EvidenceRetriever` fans subqueries out to it and fuses the results.

pub mod box_index;
pub mod index;
pub mod retriever;
