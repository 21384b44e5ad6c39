//! Transcript store backed by the server's conversation endpoints.

use std::time::Duration;

use nudge_core::{
    async_trait, ConversationInfo, NewMessage, NudgeError, StoredMessage, TranscriptStore,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::EngineConfig;
use crate::gateway::error_message;

#[derive(Debug, Deserialize)]
struct ConversationList {
    conversations: Vec<ConversationInfo>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    messages: Vec<StoredMessage>,
}

/// [`TranscriptStore`] that talks to `/v1/conversations` on the proxy.
///
/// The server scopes every call to the owner of the session token, so this
/// client never passes an owner id itself.
pub struct HttpTranscriptStore {
    client: Client,
    base_url: String,
    access_token: String,
}

impl HttpTranscriptStore {
    /// Create a store client for the server described by `config`.
    pub fn new(config: &EngineConfig) -> Result<Self, NudgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| {
                NudgeError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.conversations_endpoint(),
            access_token: config.access_token.clone(),
        })
    }

    fn conversation_url(&self, conversation_id: &str) -> String {
        format!("{}/{}", self.base_url, conversation_id)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        conversation_id: Option<&str>,
    ) -> Result<String, NudgeError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| NudgeError::Storage(format!("Failed to reach store: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NudgeError::Storage(format!("Failed to read store response: {}", e)))?;

        match status {
            s if s.is_success() => Ok(body),
            StatusCode::UNAUTHORIZED => Err(NudgeError::Unauthorized(error_message(&body))),
            StatusCode::NOT_FOUND => Err(NudgeError::ConversationNotFound(
                conversation_id.unwrap_or_default().to_string(),
            )),
            StatusCode::CONFLICT => Err(NudgeError::Conflict(error_message(&body))),
            s => Err(NudgeError::Storage(format!(
                "store returned {}: {}",
                s.as_u16(),
                error_message(&body)
            ))),
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        conversation_id: Option<&str>,
    ) -> Result<T, NudgeError> {
        let body = self.send(request, conversation_id).await?;
        serde_json::from_str(&body)
            .map_err(|e| NudgeError::Storage(format!("Invalid store response: {}", e)))
    }
}

#[async_trait]
impl TranscriptStore for HttpTranscriptStore {
    async fn create_conversation(&self) -> Result<String, NudgeError> {
        let info: ConversationInfo = self
            .send_json(
                self.client.post(&self.base_url).json(&json!({})),
                None,
            )
            .await?;
        debug!("Created remote conversation {}", info.id);
        Ok(info.id)
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationInfo>, NudgeError> {
        let list: ConversationList = self.send_json(self.client.get(&self.base_url), None).await?;
        Ok(list.conversations)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationInfo, NudgeError> {
        self.send_json(
            self.client.get(self.conversation_url(conversation_id)),
            Some(conversation_id),
        )
        .await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>, NudgeError> {
        let url = format!("{}/messages", self.conversation_url(conversation_id));
        let list: MessageList = self
            .send_json(self.client.get(url), Some(conversation_id))
            .await?;
        Ok(list.messages)
    }

    async fn save_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<StoredMessage, NudgeError> {
        let url = format!("{}/messages", self.conversation_url(conversation_id));
        self.send_json(self.client.post(url).json(&message), Some(conversation_id))
            .await
    }

    async fn update_metadata(&self, conversation_id: &str, metadata: Value) -> Result<(), NudgeError> {
        let url = format!("{}/metadata", self.conversation_url(conversation_id));
        self.send(
            self.client.put(url).json(&json!({ "metadata": metadata })),
            Some(conversation_id),
        )
        .await?;
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), NudgeError> {
        self.send(
            self.client.delete(self.conversation_url(conversation_id)),
            Some(conversation_id),
        )
        .await?;
        Ok(())
    }
}
