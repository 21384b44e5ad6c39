//! Status tools for the Nudge assistant.
//!
//! The assistant can call exactly two functions:
//!
//! - `get_status` - returns `{"blocked": 0|1}`
//! - `set_status(blocked)` - sets the flag, returns `{"status":"success","blocked": 0|1}`
//!
//! Anything else (unknown names, malformed or out-of-range arguments) is
//! answered with `{"status":"error","message": ...}` so the model can see
//! what went wrong and try again.
//!
//! # Example
//!
//! ```rust
//! use nudge_core::{ToolCall, ToolExecutor};
//! use status_tools::StatusToolExecutor;
//!
//! let mut tools = StatusToolExecutor::new();
//! tools.execute(&ToolCall::new("call_1", "set_status", r#"{"blocked":1}"#));
//!
//! let status = tools.execute(&ToolCall::new("call_2", "get_status", "{}"));
//! assert_eq!(status.content, r#"{"blocked":1}"#);
//! ```

mod args;
mod definitions;
mod error;
mod executor;

pub use args::ToolArgs;
pub use definitions::{
    get_status_definition, set_status_definition, status_definitions, GET_STATUS, SET_STATUS,
};
pub use error::ToolError;
pub use executor::StatusToolExecutor;
