//! In-memory transcript store.
//!
//! Keeps conversations in insertion/activity order so listing by recency is
//! just a reverse walk. Useful offline and in tests; nothing survives the
//! process.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::error::NudgeError;
use crate::store::{ConversationInfo, NewMessage, StoredMessage, TranscriptStore};

#[derive(Debug, Clone)]
struct MemoryConversation {
    metadata: Value,
    created_at: String,
    updated_at: String,
    messages: Vec<StoredMessage>,
}

/// Transcript store backed by process memory.
///
/// # Example
///
/// ```rust
/// use nudge_core::{Message, MemoryTranscriptStore, NewMessage, TranscriptStore};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let store = MemoryTranscriptStore::new();
///     let id = store.create_conversation().await.unwrap();
///
///     let msg = NewMessage::from_message(&Message::user("hi"), 0).unwrap();
///     store.save_message(&id, msg).await.unwrap();
///
///     assert_eq!(store.get_messages(&id).await.unwrap().len(), 1);
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    /// Conversations by id; the last entry is the most recently active.
    conversations: RwLock<IndexMap<String, MemoryConversation>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations held.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

fn now() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
}

fn not_found(id: &str) -> NudgeError {
    NudgeError::ConversationNotFound(id.to_string())
}

fn info(id: &str, conversation: &MemoryConversation) -> ConversationInfo {
    ConversationInfo {
        id: id.to_string(),
        metadata: conversation.metadata.clone(),
        created_at: conversation.created_at.clone(),
        updated_at: conversation.updated_at.clone(),
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn create_conversation(&self) -> Result<String, NudgeError> {
        let id = uuid::Uuid::new_v4().to_string();
        let stamp = now();
        let mut conversations = self.conversations.write().await;
        conversations.insert(
            id.clone(),
            MemoryConversation {
                metadata: Value::Object(Default::default()),
                created_at: stamp.clone(),
                updated_at: stamp,
                messages: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationInfo>, NudgeError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .iter()
            .rev()
            .map(|(id, conversation)| info(id, conversation))
            .collect())
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationInfo, NudgeError> {
        let conversations = self.conversations.read().await;
        conversations
            .get(conversation_id)
            .map(|conversation| info(conversation_id, conversation))
            .ok_or_else(|| not_found(conversation_id))
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>, NudgeError> {
        let conversations = self.conversations.read().await;
        let conversation = conversations
            .get(conversation_id)
            .ok_or_else(|| not_found(conversation_id))?;

        let mut messages = conversation.messages.clone();
        messages.sort_by_key(|m| m.sequence_order);
        Ok(messages)
    }

    async fn save_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<StoredMessage, NudgeError> {
        let mut conversations = self.conversations.write().await;

        // Move to end to mark as most recently active
        let mut conversation = conversations
            .shift_remove(conversation_id)
            .ok_or_else(|| not_found(conversation_id))?;

        let duplicate = conversation
            .messages
            .iter()
            .any(|m| m.sequence_order == message.sequence_order);

        let stored = StoredMessage {
            conversation_id: conversation_id.to_string(),
            role: message.role.as_str().to_string(),
            content: message.content,
            tool_calls: message.tool_calls,
            tool_call_id: message.tool_call_id,
            sequence_order: message.sequence_order,
            created_at: Some(now()),
        };

        if !duplicate {
            conversation.updated_at = now();
            conversation.messages.push(stored.clone());
        }
        conversations.insert(conversation_id.to_string(), conversation);

        if duplicate {
            return Err(NudgeError::Conflict(format!(
                "sequence_order {} already used in conversation {}",
                stored.sequence_order, conversation_id
            )));
        }

        Ok(stored)
    }

    async fn update_metadata(&self, conversation_id: &str, metadata: Value) -> Result<(), NudgeError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| not_found(conversation_id))?;
        conversation.metadata = metadata;
        conversation.updated_at = now();
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), NudgeError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .shift_remove(conversation_id)
            .map(|_| ())
            .ok_or_else(|| not_found(conversation_id))
    }
}
