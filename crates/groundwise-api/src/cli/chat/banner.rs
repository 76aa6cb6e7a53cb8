//! Welcome banner display for chat sessions.

use console::style;

/// Print the banner at the start of a chat: model, index, session.
///
/// `resumed_turns` is the number of turns already stored when an existing
/// session is picked up.
pub fn print_welcome_banner(model: &str, index: &str, session_id: &str, resumed_turns: usize) {
    println!();
    println!("  * {}", style("Groundwise").cyan().bold());
    println!(
        "  {}",
        style("Answers grounded in your evidence, with citations").dim()
    );
    println!();
    println!("  {}    {}", style("Model:").bold(), style(model).dim());
    println!("  {}    {}", style("Index:").bold(), style(index).dim());
    println!("  {}  {}", style("Session:").bold(), style(session_id).dim());
    if resumed_turns > 0 {
        println!(
            "  {}  {} earlier turns",
            style("Resumed:").bold(),
            style(resumed_turns).dim()
        );
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
