//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and give in-chat access to the session: its turn
//! log, its facts, free-text context, and a reset.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// End the chat.
    Exit,
    /// Show recent turns for this session.
    History,
    /// Show stored facts.
    Facts,
    /// Add free-text context about the user without asking anything.
    Context(String),
    /// Forget every turn and fact in this session.
    Clear,
    /// Unknown command, or a known one used wrongly.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/history" => ChatCommand::History,
        "/facts" => ChatCommand::Facts,
        "/context" | "/ctx" => {
            if arg.is_empty() {
                ChatCommand::Unknown("/context requires some text".to_string())
            } else {
                ChatCommand::Context(arg.to_string())
            }
        }
        "/clear" => ChatCommand::Clear,
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Print the help text listing all available commands.
pub fn print_help() {
    let rows = [
        ("/help", "Show this help message"),
        ("/history", "Show recent turns"),
        ("/facts", "Show what the assistant knows about you"),
        ("/context <text>", "Add context without asking a question"),
        ("/clear", "Forget this session's turns and facts"),
        ("/exit", "End the chat"),
    ];

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (name, description) in rows {
        println!("  {:<18} {}", style(name).cyan(), description);
    }
    println!();
    println!(
        "  {}",
        style("Ctrl+D to exit, Ctrl+C is safe (nothing is lost)").dim()
    );
    println!();
}
