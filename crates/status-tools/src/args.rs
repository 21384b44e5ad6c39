//! Typed access to tool call arguments.

use nudge_core::{ToolCall, ToolRequest};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Arguments passed to a tool for execution.
#[derive(Debug, Clone)]
pub struct ToolArgs {
    /// Parameters as key-value pairs.
    pub params: Map<String, Value>,
}

impl ToolArgs {
    /// Create new tool arguments with the given parameters.
    pub fn new(params: Map<String, Value>) -> Self {
        Self { params }
    }

    /// Parse the raw arguments string of a tool call.
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let request = ToolRequest::from_tool_call(call)?;
        Ok(Self::new(request.arguments))
    }

    /// Get an integer parameter, returning an error if missing or not an integer.
    ///
    /// Integral floats (`1.0`) are accepted; strings and booleans are not.
    pub fn get_integer(&self, key: &str) -> Result<i64, ToolError> {
        let value = self
            .params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))?;

        if let Some(n) = value.as_i64() {
            return Ok(n);
        }

        match value.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            _ => Err(ToolError::InvalidParameter {
                name: key.to_string(),
                reason: "expected integer".to_string(),
            }),
        }
    }

    /// Get a 0/1 flag parameter.
    pub fn get_flag(&self, key: &str) -> Result<u8, ToolError> {
        match self.get_integer(key)? {
            0 => Ok(0),
            1 => Ok(1),
            other => Err(ToolError::InvalidParameter {
                name: key.to_string(),
                reason: format!("must be 0 or 1, got {}", other),
            }),
        }
    }
}
