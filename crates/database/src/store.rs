//! [`TranscriptStore`] over SQLite for one owner.

use nudge_core::{
    async_trait, ConversationInfo, NewMessage, NudgeError, StoredMessage, TranscriptStore,
};
use serde_json::Value;

use crate::{conversation, message, Database};

/// Transcript store bound to a single owner.
///
/// The server creates one per authenticated request.
#[derive(Debug, Clone)]
pub struct SqliteTranscriptStore {
    db: Database,
    owner_id: String,
}

impl SqliteTranscriptStore {
    pub fn new(db: Database, owner_id: impl Into<String>) -> Self {
        Self {
            db,
            owner_id: owner_id.into(),
        }
    }

    /// Owner every query is scoped to.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn create_conversation(&self) -> Result<String, NudgeError> {
        let conversation = conversation::create_conversation(self.db.pool(), &self.owner_id).await?;
        Ok(conversation.id)
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationInfo>, NudgeError> {
        let conversations = conversation::list_conversations(self.db.pool(), &self.owner_id).await?;
        conversations
            .iter()
            .map(|c| c.to_info().map_err(NudgeError::from))
            .collect()
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationInfo, NudgeError> {
        let conversation =
            conversation::get_conversation(self.db.pool(), &self.owner_id, conversation_id).await?;
        Ok(conversation.to_info()?)
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>, NudgeError> {
        let records =
            message::list_messages(self.db.pool(), &self.owner_id, conversation_id).await?;
        records
            .iter()
            .map(|r| r.to_stored().map_err(NudgeError::from))
            .collect()
    }

    async fn save_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<StoredMessage, NudgeError> {
        let record =
            message::insert_message(self.db.pool(), &self.owner_id, conversation_id, &message)
                .await?;
        Ok(record.to_stored()?)
    }

    async fn update_metadata(&self, conversation_id: &str, metadata: Value) -> Result<(), NudgeError> {
        conversation::update_metadata(self.db.pool(), &self.owner_id, conversation_id, &metadata)
            .await?;
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), NudgeError> {
        conversation::delete_conversation(self.db.pool(), &self.owner_id, conversation_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nudge_core::Message;
    use serde_json::json;

    async fn store(owner: &str) -> SqliteTranscriptStore {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        SqliteTranscriptStore::new(db, owner)
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let store = store("alice").await;
        let id = store.create_conversation().await.unwrap();

        let saved = store
            .save_message(&id, NewMessage::from_message(&Message::user("hi"), 0).unwrap())
            .await
            .unwrap();
        assert_eq!(saved.role, "user");
        assert_eq!(saved.sequence_order, 0);

        store
            .update_metadata(&id, json!({ "blocked": 1 }))
            .await
            .unwrap();
        let info = store.get_conversation(&id).await.unwrap();
        assert_eq!(info.metadata, json!({ "blocked": 1 }));

        let listed = store.get_conversations().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);

        let messages = store.get_messages(&id).await.unwrap();
        assert_eq!(messages[0].to_message().unwrap(), Message::user("hi"));

        store.delete_conversation(&id).await.unwrap();
        assert_eq!(
            store.get_messages(&id).await,
            Err(NudgeError::ConversationNotFound(id.clone()))
        );
    }

    #[tokio::test]
    async fn test_foreign_owner_is_not_found() {
        let alice = store("alice").await;
        let id = alice.create_conversation().await.unwrap();
        let mallory = SqliteTranscriptStore::new(alice.db.clone(), "mallory");

        assert_eq!(
            mallory.get_conversation(&id).await,
            Err(NudgeError::ConversationNotFound(id.clone()))
        );
        assert!(matches!(
            mallory.delete_conversation(&id).await,
            Err(NudgeError::ConversationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reused_sequence_is_conflict() {
        let store = store("alice").await;
        let id = store.create_conversation().await.unwrap();
        let row = NewMessage::from_message(&Message::user("hi"), 0).unwrap();

        store.save_message(&id, row.clone()).await.unwrap();
        assert!(matches!(
            store.save_message(&id, row).await,
            Err(NudgeError::Conflict(_))
        ));
    }
}
