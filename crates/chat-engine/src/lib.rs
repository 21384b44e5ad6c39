//! Conversation engine for Nudge.
//!
//! This crate drives the tool-calling conversation protocol:
//!
//! - [`ConversationEngine`] - owns the transcript and runs the gateway loop
//! - [`ModelGateway`] / [`HttpGateway`] - the authenticated chat proxy call
//! - [`HttpTranscriptStore`] - persistence over the server's conversation API
//! - [`wire`] - transcript encoding and response decoding
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chat_engine::{ConversationEngine, EngineConfig, HttpGateway, HttpTranscriptStore};
//! use status_tools::StatusToolExecutor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_env()?;
//!     let gateway = HttpGateway::new(&config)?;
//!     let store = Arc::new(HttpTranscriptStore::new(&config)?);
//!
//!     let engine = ConversationEngine::new(config, gateway, StatusToolExecutor::new())
//!         .with_store(store);
//!     let reply = engine.submit("block instagram now").await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

mod api_types;
mod config;
mod engine;
mod gateway;
mod remote_store;
pub mod wire;

pub use api_types::{
    ApiError, ApiErrorDetails, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice,
    FunctionCall, ResponseMessage, Usage, WireTool, WireToolCall,
};
pub use config::{EngineConfig, EngineConfigBuilder, DEFAULT_MODEL, DEFAULT_PROXY_URL};
pub use engine::{ChatStatus, ConversationEngine};
pub use gateway::{HttpGateway, ModelGateway};
pub use remote_store::HttpTranscriptStore;

// Re-export nudge-core types for convenience
pub use nudge_core::{
    async_trait, Message, NudgeError, ToolCall, ToolExecutor, TranscriptStore,
};
