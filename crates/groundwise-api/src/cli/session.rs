//! Session inspection CLI commands: show, facts, set-fact, history, list.
//!
//! Read-only commands load the stored record directly so inspecting a
//! session never creates one. `set-fact` goes through `SessionMemory` and
//! is written through like any other mutation.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::Value;

use groundwise_types::error::PersistenceError;
use groundwise_types::session::{Role, Session, Turn};

use super::{DEFAULT_SESSION, ui};
use crate::state::{AppState, parse_session_id};

/// Session subcommands.
#[derive(Subcommand)]
pub enum SessionCommand {
    /// Summary of one session.
    Show {
        #[arg(long, short, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Stored facts for one session.
    Facts {
        #[arg(long, short, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Set a fact (value is JSON, or a plain string if it does not parse).
    SetFact {
        /// Fact name.
        key: String,

        /// JSON value (string, number, boolean, object, array, null).
        value: String,

        #[arg(long, short, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Turn log for one session.
    History {
        #[arg(long, short, default_value = DEFAULT_SESSION)]
        session: String,

        /// Only show the last N turns.
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// List stored sessions.
    #[command(alias = "ls")]
    List,
}

/// Handle a session subcommand.
pub async fn handle_session_command(cmd: SessionCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        SessionCommand::Show { session } => show_session(state, &session, json).await,
        SessionCommand::Facts { session } => show_facts(state, &session, json).await,
        SessionCommand::SetFact {
            key,
            value,
            session,
        } => set_fact(state, &session, &key, &value, json).await,
        SessionCommand::History { session, limit } => {
            show_history(state, &session, limit, json).await
        }
        SessionCommand::List => list_sessions(state, json).await,
    }
}

/// Load a stored session, or `None` when it was never created.
async fn load_existing(state: &AppState, raw_id: &str) -> Result<Option<Session>> {
    let id = parse_session_id(raw_id)?;
    match state.store.load(&id).await {
        Ok(session) => Ok(Some(session)),
        Err(PersistenceError::NotFound) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to load session '{raw_id}'")),
    }
}

fn print_missing(raw_id: &str, json: bool) -> Result<()> {
    if json {
        let result = serde_json::json!({ "session_id": raw_id, "exists": false });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} No session '{}'. Start one with: {}",
            style("i").blue().bold(),
            style(raw_id).cyan(),
            style(format!("groundwise chat --session {raw_id}")).yellow()
        );
        println!();
    }
    Ok(())
}

async fn show_session(state: &AppState, raw_id: &str, json: bool) -> Result<()> {
    let Some(session) = load_existing(state, raw_id).await? else {
        return print_missing(raw_id, json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    let questions = session.turns.iter().filter(|t| t.role == Role::User).count();

    println!();
    println!("  Session '{}'", style(session.id.as_str()).cyan().bold());
    println!();
    println!(
        "  {}  {}",
        style("Created:").bold(),
        session.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {}  {}",
        style("Updated:").bold(),
        session.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {}    {} ({} from you)",
        style("Turns:").bold(),
        session.turns.len(),
        questions
    );
    println!("  {}    {}", style("Facts:").bold(), session.facts.len());

    if let Some(last) = session.turns.iter().rev().find(|t| t.role == Role::User) {
        println!(
            "  {}     {}",
            style("Last:").bold(),
            style(ui::truncate(&last.text, 60)).dim()
        );
    }
    println!();

    Ok(())
}

async fn show_facts(state: &AppState, raw_id: &str, json: bool) -> Result<()> {
    let Some(session) = load_existing(state, raw_id).await? else {
        return print_missing(raw_id, json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session.facts)?);
        return Ok(());
    }

    if session.facts.is_empty() {
        println!();
        println!(
            "  {} No facts stored for '{}'. Add one with: {}",
            style("i").blue().bold(),
            style(raw_id).cyan(),
            style(format!("groundwise session set-fact KEY VALUE --session {raw_id}")).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Fact").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    for (key, value) in &session.facts {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(ui::truncate(&render_value(value), 80)).fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Parse a fact value as JSON, falling back to a plain string.
fn parse_fact_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn set_fact(state: &AppState, raw_id: &str, key: &str, raw_value: &str, json: bool) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("fact name must not be empty");
    }

    let value = parse_fact_value(raw_value);
    let mut memory = state.open_session(parse_session_id(raw_id)?).await?;
    memory
        .set_fact(key, value.clone())
        .await
        .with_context(|| format!("failed to store fact '{key}'"))?;

    if json {
        let result = serde_json::json!({
            "session_id": raw_id,
            "key": key,
            "value": value,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Set '{}' for session '{}'",
            style("ok").green(),
            style(key).cyan(),
            style(raw_id).cyan(),
        );
        println!();
    }

    Ok(())
}

/// The last `limit` turns, or all of them.
fn tail(turns: &[Turn], limit: Option<usize>) -> &[Turn] {
    match limit {
        Some(n) => &turns[turns.len().saturating_sub(n)..],
        None => turns,
    }
}

async fn show_history(state: &AppState, raw_id: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let Some(session) = load_existing(state, raw_id).await? else {
        return print_missing(raw_id, json);
    };
    let turns = tail(&session.turns, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(turns)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!();
        println!(
            "  {} Session '{}' has no turns yet.",
            style("i").blue().bold(),
            style(raw_id).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Text").fg(Color::White),
        Cell::new("Cites").fg(Color::White),
    ]);

    for turn in turns {
        let role_cell = match turn.role {
            Role::User => Cell::new("you").fg(Color::Green),
            Role::Assistant => Cell::new("assistant").fg(Color::Cyan),
        };
        table.add_row(vec![
            Cell::new(turn.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()).fg(Color::DarkGrey),
            role_cell,
            Cell::new(ui::truncate(&turn.text, 100)).fg(Color::White),
            Cell::new(turn.citations.join(", ")).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let ids = state.store.list().await.context("failed to list sessions")?;

    let mut sessions = Vec::with_capacity(ids.len());
    for id in &ids {
        match state.store.load(id).await {
            Ok(session) => sessions.push(session),
            Err(e) => tracing::warn!(session_id = %id, error = %e, "Skipping unreadable session"),
        }
    }

    if json {
        let rows: Vec<Value> = sessions
            .iter()
            .map(|s| {
                serde_json::json!({
                    "session_id": s.id.as_str(),
                    "turns": s.turns.len(),
                    "facts": s.facts.len(),
                    "updated_at": s.updated_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions yet. Start one with: {}",
            style("i").blue().bold(),
            style("groundwise chat").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Session").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Turns").fg(Color::White),
        Cell::new("Facts").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(session.id.as_str()).fg(Color::Cyan),
            Cell::new(session.updated_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::White),
            Cell::new(session.turns.len().to_string()).fg(Color::White),
            Cell::new(session.facts.len().to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{} ({} store)",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" },
        state.store.name()
    );
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_parse_fact_value_json() {
        assert_eq!(parse_fact_value("true"), json!(true));
        assert_eq!(parse_fact_value("42"), json!(42));
        assert_eq!(parse_fact_value(r#"{"a": 1}"#), json!({"a": 1}));
    }

    #[test]
    fn test_parse_fact_value_falls_back_to_string() {
        assert_eq!(parse_fact_value("Sydney"), json!("Sydney"));
        assert_eq!(parse_fact_value("not { json"), json!("not { json"));
    }

    #[test]
    fn test_render_value_unquotes_strings() {
        assert_eq!(render_value(&json!("Sydney")), "Sydney");
        assert_eq!(render_value(&json!([1, 2])), "[1,2]");
    }

    fn turn(text: &str) -> Turn {
        Turn {
            role: Role::User,
            text: text.to_string(),
            timestamp: Utc::now(),
            citations: vec![],
        }
    }

    #[test]
    fn test_tail_limits_to_last_turns() {
        let turns = vec![turn("a"), turn("b"), turn("c")];
        let last: Vec<&str> = tail(&turns, Some(2)).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(last, vec!["b", "c"]);
        assert_eq!(tail(&turns, Some(10)).len(), 3);
        assert_eq!(tail(&turns, None).len(), 3);
    }
}
