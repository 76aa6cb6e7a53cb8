//! Main chat loop.
//!
//! Builds the pipeline once, opens the session, then alternates between
//! reading a line and either running a slash command or answering a turn.
//! Every turn is persisted by `SessionMemory` as it completes, so leaving
//! the loop needs no cleanup beyond restoring the terminal.

use console::style;

use groundwise_core::memory::session::SessionMemory;
use groundwise_infra::filesystem::resolve_index_path;
use groundwise_types::session::{Role, SessionId};

use crate::cli::ask::print_outcome;
use crate::cli::ui;
use crate::state::{AppState, parse_session_id, turn_error};

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

const HISTORY_PREVIEW_TURNS: usize = 10;

/// Shown after a failed turn. Facts found in the text are already stored,
/// only the exchange is dropped.
const FAILED_TURN_NOTE: &str = "No answer was saved for this turn. Try again, or /exit to quit.";

/// Run the interactive chat loop, resuming `session` when given.
pub async fn run_chat_loop(state: &AppState, session: Option<String>) -> anyhow::Result<()> {
    let orchestrator = state.build_orchestrator().await?;

    let id = match session.as_deref() {
        Some(raw) => parse_session_id(raw)?,
        None => SessionId::generate(),
    };
    let mut memory = state.open_session(id).await?;

    let index_label = format!(
        "{} ({})",
        state.config.index.table,
        resolve_index_path(&state.data_dir, &state.config.index).display()
    );
    print_welcome_banner(
        &state.config.generator.model,
        &index_label,
        memory.id().as_str(),
        memory.session().turns.len(),
    );

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
            }
            InputEvent::Message(text) if text.is_empty() => {}
            InputEvent::Message(text) => {
                if let Some(cmd) = commands::parse(&text) {
                    let keep_going = run_command(cmd, &mut memory, &mut chat_input).await;
                    if !keep_going {
                        println!("\n  {}", style("Session ended.").dim());
                        break;
                    }
                    continue;
                }

                let spinner = ui::spinner("searching evidence...", false);
                let result = orchestrator.answer(&mut memory, &text).await;
                spinner.finish_and_clear();

                match result {
                    Ok(outcome) => print_outcome(&outcome, false),
                    Err(e) => {
                        let err = turn_error(e);
                        eprintln!("\n  {} {err}", style("!").red().bold());
                        eprintln!("  {}", style(FAILED_TURN_NOTE).dim());
                        println!();
                    }
                }
            }
        }
    }

    chat_input.flush();
    tracing::info!(session_id = %memory.id(), turns = memory.session().turns.len(), "chat ended");
    Ok(())
}

/// Execute a slash command. Returns `false` when the chat should end.
async fn run_command(cmd: ChatCommand, memory: &mut SessionMemory, input: &mut ChatInput) -> bool {
    match cmd {
        ChatCommand::Help => commands::print_help(),
        ChatCommand::Exit => return false,
        ChatCommand::History => print_history(memory),
        ChatCommand::Facts => print_facts(memory),
        ChatCommand::Context(text) => match memory.append_context(&text).await {
            Ok(()) => println!(
                "\n  {} Noted: {}\n",
                style("*").cyan().bold(),
                style(&text).dim()
            ),
            Err(e) => println!("\n  {} Failed to save context: {e}\n", style("!").red().bold()),
        },
        ChatCommand::Clear => match memory.clear().await {
            Ok(()) => {
                input.clear();
                println!(
                    "\n  {} Session '{}' cleared.\n",
                    style("*").cyan().bold(),
                    memory.id()
                );
            }
            Err(e) => println!("\n  {} Failed to clear session: {e}\n", style("!").red().bold()),
        },
        ChatCommand::Unknown(name) => println!(
            "\n  {} Unknown command: {}. Type /help for available commands.\n",
            style("?").yellow().bold(),
            style(name).dim()
        ),
    }
    true
}

fn print_history(memory: &SessionMemory) {
    let turns = memory.get_recent_turns(HISTORY_PREVIEW_TURNS);
    println!();
    if turns.is_empty() {
        println!("  {}", style("(no turns yet)").dim());
    }
    for turn in turns {
        let label = match turn.role {
            Role::User => style("You").green(),
            Role::Assistant => style("Groundwise").cyan(),
        };
        println!("  {} {}", label.bold(), ui::truncate(&turn.text, 100));
    }
    println!();
}

fn print_facts(memory: &SessionMemory) {
    let facts = memory.get_facts();
    println!();
    if facts.is_empty() {
        println!("  {}", style("(no facts stored)").dim());
    }
    for (key, value) in facts {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!("  {} {}", style(format!("{key}:")).cyan(), ui::truncate(&rendered, 80));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_turn_note_only_disclaims_the_answer() {
        assert!(FAILED_TURN_NOTE.starts_with("No answer was saved"));
        assert!(!FAILED_TURN_NOTE.contains("Nothing"));
    }
}
