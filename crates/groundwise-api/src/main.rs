//! Groundwise CLI entry point.
//!
//! Binary name: `groundwise`
//!
//! Parses CLI arguments, sets up tracing, initializes application state,
//! then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, DEFAULT_SESSION};
use groundwise_observe::tracing_setup::{default_filter, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "groundwise", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(default_filter(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;

    match cli.command {
        Commands::Ask {
            question,
            session,
            debug,
        } => {
            let session = session.as_deref().unwrap_or(DEFAULT_SESSION);
            cli::ask::ask(&state, &question, session, debug, cli.json, cli.quiet).await
        }

        Commands::Chat { session } => cli::chat::loop_runner::run_chat_loop(&state, session).await,

        Commands::Session { action } => {
            cli::session::handle_session_command(action, &state, cli.json).await
        }

        Commands::Check => cli::check::check(&state, cli.json).await,

        Commands::Completions { .. } => unreachable!("handled above"),
    }
}
