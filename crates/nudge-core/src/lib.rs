//! Core types for the Nudge chat engine.
//!
//! This crate provides the shared vocabulary used by the engine, the tool
//! executor, and the persistence layers:
//!
//! - [`Message`] / [`ToolCall`] - Transcript entries, one variant per role
//! - [`ToolExecutor`] - Trait for local tool dispatch
//! - [`ToolDefinition`] - Static schema advertised to the model
//! - [`TranscriptStore`] - Trait for durable conversation storage
//! - [`NudgeError`] - Error type for engine operations
//!
//! # Example
//!
//! ```rust
//! use nudge_core::{Message, ToolCall};
//!
//! let call = ToolCall::new("call_1", "get_status", "{}");
//! let step = Message::assistant_tool_calls(None, vec![call]);
//! assert!(step.is_tool_step());
//!
//! let reply = Message::assistant("You're all set.");
//! assert!(!reply.is_tool_step());
//! ```

mod error;
mod memory_store;
mod message;
mod prompt;
mod store;
mod tools;

pub use error::NudgeError;
pub use memory_store::MemoryTranscriptStore;
pub use message::{Message, Role, ToolCall};
pub use prompt::{hash_prompt, DEFAULT_SYSTEM_PROMPT};
pub use store::{ConversationInfo, NewMessage, StoredMessage, TranscriptStore};
pub use tools::{
    ParameterSchema, PropertySchema, ToolDefinition, ToolExecutor, ToolRequest, ToolResult,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
