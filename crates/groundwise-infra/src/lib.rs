//! Infrastructure layer for Groundwise.
//!
//! Contains implementations of the ports defined in `groundwise-core`:
//! an OpenAI-compatible generator client (Ollama by default), a LanceDB
//! evidence index with fastembed query embeddings, JSON-file and SQLite
//! session stores, and the `config.toml` loader.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod session;
pub mod sqlite;
pub mod vector;
