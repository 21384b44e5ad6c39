//! Error types for engine operations.

use thiserror::Error;

/// Errors that can occur while driving a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NudgeError {
    /// The submitted text was empty or whitespace only.
    #[error("message is empty")]
    EmptyInput,

    /// Another submission is still waiting on the gateway.
    #[error("a request is already in progress")]
    Busy,

    /// No valid session for the gateway or store.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Transport failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response from the proxy or the upstream provider.
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The gateway answered with something that is not a chat completion.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The model kept requesting tools past the configured cap.
    #[error("model requested tools for more than {0} rounds")]
    ToolLoopLimit(usize),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Persistence read or write failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Conversation does not exist or is not owned by the caller.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// The write collides with a stored record, such as a reused
    /// `sequence_order`.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl NudgeError {
    /// Whether this error belongs to the single "request failed" state
    /// shown to the user after a gateway round-trip went wrong.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            NudgeError::Network(_)
                | NudgeError::Upstream { .. }
                | NudgeError::MalformedResponse(_)
                | NudgeError::ToolLoopLimit(_)
        )
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            NudgeError::EmptyInput => "Type a message first.".to_string(),
            NudgeError::Busy => "Still working on your last message.".to_string(),
            NudgeError::Unauthorized(_) => "You need to sign in again.".to_string(),
            NudgeError::Upstream { message, .. } => {
                format!("Request failed: {}", message)
            }
            err if err.is_request_failure() => {
                "Request failed. Please try sending your message again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
