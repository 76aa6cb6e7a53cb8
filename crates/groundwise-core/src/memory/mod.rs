//! Per-session memory for Groundwise.
//!
//! `SessionStore` is the persistence port; `SessionMemory` owns one
//! session's turns and facts and writes through on every mutation;
//! `FactExtractor` pulls stable facts out of user text.

pub mod facts;
pub mod session;
pub mod store;
