//! ToolExecutor implementation for the blocking status flag.

use nudge_core::{ToolCall, ToolDefinition, ToolExecutor, ToolResult};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::args::ToolArgs;
use crate::definitions::{status_definitions, GET_STATUS, SET_STATUS};
use crate::error::ToolError;

/// Executes `get_status` and `set_status` against one in-memory flag.
///
/// The flag is the only state; `set_status` with the same value twice is
/// the same as once. Invalid arguments leave the flag untouched and come
/// back as `{"status":"error","message":...}`.
#[derive(Debug, Clone, Default)]
pub struct StatusToolExecutor {
    blocked: bool,
}

impl StatusToolExecutor {
    /// Create an executor with the flag cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with a known flag value.
    pub fn with_blocked(blocked: bool) -> Self {
        Self { blocked }
    }

    /// Current flag value.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    fn blocked_value(&self) -> u8 {
        u8::from(self.blocked)
    }

    fn get_status(&self) -> Value {
        json!({ "blocked": self.blocked_value() })
    }

    fn set_status(&mut self, call: &ToolCall) -> Result<Value, ToolError> {
        let args = ToolArgs::parse(call)?;
        let blocked = args.get_flag("blocked")?;

        let previous = self.blocked;
        self.blocked = blocked == 1;
        if previous != self.blocked {
            info!("Blocking status changed: {} -> {}", u8::from(previous), blocked);
        } else {
            debug!("Blocking status unchanged at {}", blocked);
        }

        Ok(json!({ "status": "success", "blocked": blocked }))
    }

    fn dispatch(&mut self, call: &ToolCall) -> Result<Value, ToolError> {
        match call.name.as_str() {
            GET_STATUS => Ok(self.get_status()),
            SET_STATUS => self.set_status(call),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

impl ToolExecutor for StatusToolExecutor {
    fn execute(&mut self, call: &ToolCall) -> ToolResult {
        match self.dispatch(call) {
            Ok(value) => ToolResult::success(&call.id, value),
            Err(err) => {
                warn!("Tool call '{}' failed: {}", call.name, err);
                ToolResult::error(&call.id, err.to_string())
            }
        }
    }

    fn supported_tools(&self) -> Vec<&str> {
        vec![GET_STATUS, SET_STATUS]
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        status_definitions()
    }

    fn snapshot(&self) -> Value {
        json!({ "blocked": self.blocked_value() })
    }

    fn restore(&mut self, state: &Value) {
        let blocked = match state.get("blocked") {
            Some(Value::Bool(b)) => Some(*b),
            Some(v) => v.as_i64().map(|n| n == 1),
            None => None,
        };

        if let Some(blocked) = blocked {
            self.blocked = blocked;
        }
    }
}
