//! Small terminal helpers shared by the commands.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Start a steady-ticking spinner on stderr.
///
/// Returns a hidden bar when `hidden` is set so JSON and quiet output stay
/// clean without the caller branching.
pub fn spinner(message: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

pub fn check_mark(ok: bool) -> String {
    if ok {
        format!("{}", style("✓").green())
    } else {
        format!("{}", style("✗").red())
    }
}

/// Shorten `text` to at most `max` characters, ending in `...` when cut.
///
/// Newlines are flattened so table cells stay on one line.
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let kept: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Print a remediation hint under an error message.
pub fn print_hint(hint: &str) {
    eprintln!("  {} {}", style("hint:").yellow().bold(), hint);
}
