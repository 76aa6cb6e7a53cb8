//! Shared domain types for Groundwise.
//!
//! Sessions and turns, evidence chunks, evaluation verdicts, generator
//! request shapes, configuration, and the error enums every layer shares.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod evidence;
pub mod llm;
pub mod session;
