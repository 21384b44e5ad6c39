//! Error types for tool argument handling.

use thiserror::Error;

/// Errors that can occur while validating a tool call.
///
/// These never escape the executor; they are rendered into error-shaped
/// JSON results for the model.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name not handled by this executor.
    #[error("Unknown function")]
    UnknownTool(String),

    /// Arguments string is not a JSON object.
    #[error("Invalid arguments: {0}")]
    MalformedArguments(#[from] serde_json::Error),

    /// Missing required parameter.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}
