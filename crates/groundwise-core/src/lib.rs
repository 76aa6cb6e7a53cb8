//! Pipeline logic and port traits for Groundwise.
//!
//! This crate defines the "ports" (generator, vector index, session store)
//! that the infrastructure layer implements, and the agents that run a turn
//! over them. It depends only on `groundwise-types` -- never on
//! `groundwise-infra` or any database/IO crate.

pub mod agent;
pub mod llm;
pub mod memory;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testing;
