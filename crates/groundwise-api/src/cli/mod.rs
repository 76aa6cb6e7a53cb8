//! CLI command definitions for the `groundwise` binary.
//!
//! Uses clap derive macros for argument parsing. Every command that touches a
//! session takes `--session`; without it `ask` uses the shared `default`
//! session and `chat` starts a fresh one.

pub mod ask;
pub mod chat;
pub mod check;
pub mod session;
pub mod ui;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub use session::SessionCommand;

/// Session used by one-shot commands when none is given.
pub const DEFAULT_SESSION: &str = "default";

/// Ask questions grounded in your evidence index.
#[derive(Parser)]
#[command(name = "groundwise", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export pipeline spans to stdout as OpenTelemetry traces.
    #[arg(long, global = true, env = "GROUNDWISE_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer one question and exit.
    Ask {
        /// The question (or context) to send.
        question: String,

        /// Session to read facts from and record the exchange in.
        #[arg(long, short)]
        session: Option<String>,

        /// Show subqueries, evidence ids, the evaluator verdict and stages.
        #[arg(long)]
        debug: bool,
    },

    /// Start an interactive chat.
    Chat {
        /// Resume an existing session instead of starting a new one.
        #[arg(long, short)]
        session: Option<String>,
    },

    /// Inspect and edit stored sessions.
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Check configuration, generator, index and session storage.
    Check,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_flags() {
        let cli = Cli::try_parse_from([
            "groundwise",
            "ask",
            "Can I carry 150ml saline?",
            "--session",
            "trip",
            "--debug",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Ask {
                question,
                session,
                debug,
            } => {
                assert_eq!(question, "Can I carry 150ml saline?");
                assert_eq!(session.as_deref(), Some("trip"));
                assert!(debug);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["groundwise", "-vv", "check"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_parse_set_fact() {
        let cli = Cli::try_parse_from([
            "groundwise",
            "session",
            "set-fact",
            "pregnant",
            "true",
            "--session",
            "trip",
        ])
        .unwrap();
        match cli.command {
            Commands::Session {
                action: SessionCommand::SetFact { key, value, session },
            } => {
                assert_eq!(key, "pregnant");
                assert_eq!(value, "true");
                assert_eq!(session, "trip");
            }
            _ => panic!("expected session set-fact"),
        }
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["groundwise", "ask"]).is_err());
    }
}
