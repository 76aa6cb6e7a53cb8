//! Async readline input handling for the chat loop.
//!
//! Wraps `rustyline_async::Readline` to provide async line reading with
//! EOF (Ctrl+D) and interrupt (Ctrl+C) handling.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

/// Events produced by the input handler.
#[derive(Debug)]
pub enum InputEvent {
    /// User submitted a line (trimmed).
    Message(String),
    /// End of file (Ctrl+D).
    Eof,
    /// Interrupt signal (Ctrl+C).
    Interrupted,
}

impl From<ReadlineEvent> for InputEvent {
    fn from(event: ReadlineEvent) -> Self {
        match event {
            ReadlineEvent::Line(line) => InputEvent::Message(line.trim().to_string()),
            ReadlineEvent::Eof => InputEvent::Eof,
            ReadlineEvent::Interrupted => InputEvent::Interrupted,
        }
    }
}

/// Async input handler wrapping rustyline_async.
pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Create a new chat input handler with the given prompt.
    ///
    /// Also returns the `SharedWriter` for printing without clobbering the
    /// prompt line.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt)?;
        Ok((Self { rl }, stdout))
    }

    /// Read a line of input. Read errors end the chat like Ctrl+D.
    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(event) => {
                let event = InputEvent::from(event);
                if let InputEvent::Message(line) = &event {
                    if !line.is_empty() {
                        self.rl.add_history_entry(line.clone());
                    }
                }
                event
            }
            Err(e) => {
                tracing::debug!(error = %e, "readline failed");
                InputEvent::Eof
            }
        }
    }

    /// Clear the terminal screen.
    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }

    /// Restore the terminal before exit.
    pub fn flush(&mut self) {
        let _ = self.rl.flush();
    }
}
