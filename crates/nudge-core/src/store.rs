//! Durable transcript storage contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NudgeError;
use crate::message::{Message, Role, ToolCall};

/// Conversation listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub id: String,
    /// Free-form metadata (the engine keeps tool state here).
    #[serde(default)]
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

/// A message as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub role: String,
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    pub sequence_order: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl StoredMessage {
    /// Rebuild the typed transcript entry.
    ///
    /// Rows that cannot form a valid message (unknown role, a system row, a
    /// tool row without correlation id) are rejected so replay can skip them.
    pub fn to_message(&self) -> Result<Message, String> {
        let role: Role = self.role.parse()?;
        match role {
            Role::System => Err("system messages are never replayed".to_string()),
            Role::User => self
                .content
                .clone()
                .map(Message::user)
                .ok_or_else(|| "user message without content".to_string()),
            Role::Assistant => Ok(Message::Assistant {
                content: self.content.clone(),
                tool_calls: self.tool_calls.clone().unwrap_or_default(),
            }),
            Role::Tool => match self.tool_call_id.as_deref() {
                Some(id) if !id.is_empty() => Ok(Message::tool(
                    id,
                    self.content.clone().unwrap_or_default(),
                )),
                _ => Err("tool message without tool_call_id".to_string()),
            },
        }
    }
}

/// A message to append to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub sequence_order: i64,
}

impl NewMessage {
    /// Build the storage form of a transcript entry.
    ///
    /// Returns `None` for system messages, which are never persisted.
    pub fn from_message(message: &Message, sequence_order: i64) -> Option<Self> {
        let (content, tool_calls, tool_call_id) = match message {
            Message::System { .. } => return None,
            Message::User { content } => (Some(content.clone()), None, None),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let calls = if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls.clone())
                };
                (content.clone(), calls, None)
            }
            Message::Tool {
                content,
                tool_call_id,
            } => (Some(content.clone()), None, Some(tool_call_id.clone())),
        };

        Some(Self {
            role: message.role(),
            content,
            tool_calls,
            tool_call_id,
            sequence_order,
        })
    }
}

/// Persistence interface consumed by the engine.
///
/// Implementations are scoped to one authenticated owner; ids belonging to
/// anybody else behave as if they did not exist.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Create an empty conversation and return its id.
    async fn create_conversation(&self) -> Result<String, NudgeError>;

    /// List conversations, most recently active first.
    async fn get_conversations(&self) -> Result<Vec<ConversationInfo>, NudgeError>;

    /// Fetch one conversation.
    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationInfo, NudgeError>;

    /// Messages of a conversation ordered by `sequence_order`.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>, NudgeError>;

    /// Append a message.
    async fn save_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<StoredMessage, NudgeError>;

    /// Replace the conversation metadata.
    async fn update_metadata(&self, conversation_id: &str, metadata: Value) -> Result<(), NudgeError>;

    /// Delete a conversation and all of its messages.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), NudgeError>;
}
