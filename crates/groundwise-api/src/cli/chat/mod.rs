//! Interactive chat for Groundwise.
//!
//! Reads lines with async readline, routes slash commands, and sends every
//! other line through the orchestrator against one session. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
