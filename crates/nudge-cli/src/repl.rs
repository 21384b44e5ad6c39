//! Line handling for the interactive session.

use nudge_core::Message;
use serde_json::Value;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Quit,
    Help,
    /// Show the blocking flag.
    Status,
    /// Show the conversation id.
    Id,
    Unknown(String),
    Message(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "/quit" | "/exit" => Input::Quit,
            "/help" => Input::Help,
            "/status" => Input::Status,
            "/id" => Input::Id,
            cmd if cmd.starts_with('/') && !cmd.contains(char::is_whitespace) => {
                Input::Unknown(cmd.to_string())
            }
            _ => Input::Message(line.to_string()),
        }
    }
}

pub const HELP: &str = "Commands: /status, /id, /help, /quit. Anything else is sent to Nudge.";

/// Render a visible transcript entry.
pub fn render(message: &Message) -> Option<String> {
    if !message.is_visible() {
        return None;
    }
    match message {
        Message::User { content } => Some(format!("you> {}", content)),
        Message::Assistant { content, .. } => {
            Some(format!("nudge> {}", content.as_deref().unwrap_or_default()))
        }
        _ => None,
    }
}

/// Human description of a tool-state snapshot.
pub fn describe_state(state: &Value) -> &'static str {
    match state.get("blocked").and_then(Value::as_i64) {
        Some(1) => "blocked",
        _ => "not blocked",
    }
}
