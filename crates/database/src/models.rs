//! Database models.

use nudge_core::{ConversationInfo, StoredMessage, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::Result;

/// A bearer session issued to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    /// Owner of every conversation touched with this token.
    pub user_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Expiry timestamp; `None` never expires.
    pub expires_at: Option<String>,
}

/// A conversation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    /// JSON object stored as text.
    pub metadata: String,
    pub created_at: String,
    /// Bumped whenever a message is appended or metadata changes.
    pub updated_at: String,
}

impl Conversation {
    /// Public form with parsed metadata.
    pub fn to_info(&self) -> Result<ConversationInfo> {
        Ok(ConversationInfo {
            id: self.id.clone(),
            metadata: serde_json::from_str::<Value>(&self.metadata)?,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        })
    }
}

/// A message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MessageRecord {
    /// Auto-incrementing ID.
    pub id: i64,
    pub conversation_id: String,
    /// "user", "assistant" or "tool".
    pub role: String,
    pub content: Option<String>,
    /// JSON array of tool calls, assistant rows only.
    pub tool_calls: Option<String>,
    pub tool_call_id: Option<String>,
    pub sequence_order: i64,
    pub created_at: String,
}

impl MessageRecord {
    /// Public form with decoded tool calls.
    pub fn to_stored(&self) -> Result<StoredMessage> {
        let tool_calls = match &self.tool_calls {
            Some(raw) => Some(serde_json::from_str::<Vec<ToolCall>>(raw)?),
            None => None,
        };

        Ok(StoredMessage {
            conversation_id: self.conversation_id.clone(),
            role: self.role.clone(),
            content: self.content.clone(),
            tool_calls,
            tool_call_id: self.tool_call_id.clone(),
            sequence_order: self.sequence_order,
            created_at: Some(self.created_at.clone()),
        })
    }
}
