//! Generator abstractions for Groundwise.
//!
//! - `LlmProvider`: RPITIT trait for concrete backends
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `Generator`: the `generate(system, user) -> text` call every agent uses

pub mod box_provider;
pub mod generator;
pub mod provider;
