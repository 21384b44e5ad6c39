//! Conversation and message endpoints, scoped to the session's user.

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use database::SqliteTranscriptStore;
use nudge_core::{ConversationInfo, NewMessage, Role, StoredMessage, TranscriptStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth::authorize;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<ConversationInfo>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataUpdate {
    pub metadata: Value,
}

/// Transcript store for the session's user.
async fn owner_store(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<SqliteTranscriptStore, ApiError> {
    let session = authorize(state, headers).await?;
    Ok(SqliteTranscriptStore::new(state.db.clone(), session.user_id))
}

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ConversationList>, ApiError> {
    let store = owner_store(&state, &headers).await?;
    let conversations = store.get_conversations().await?;
    Ok(Json(ConversationList { conversations }))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let store = owner_store(&state, &headers).await?;
    let id = store.create_conversation().await?;
    info!("Created conversation {} for user {}", id, store.owner_id());

    let created = store.get_conversation(&id).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ConversationInfo>, ApiError> {
    let store = owner_store(&state, &headers).await?;
    Ok(Json(store.get_conversation(&id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let store = owner_store(&state, &headers).await?;
    store.delete_conversation(&id).await?;
    info!("Deleted conversation {} for user {}", id, store.owner_id());
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageList>, ApiError> {
    let store = owner_store(&state, &headers).await?;
    let messages = store.get_messages(&id).await?;
    Ok(Json(MessageList { messages }))
}

pub async fn save_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(new_message): Json<NewMessage>,
) -> Result<Response, ApiError> {
    let store = owner_store(&state, &headers).await?;
    validate_message(&new_message)?;

    let stored = store.save_message(&id, new_message).await?;
    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

pub async fn update_metadata(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<MetadataUpdate>,
) -> Result<Json<ConversationInfo>, ApiError> {
    let store = owner_store(&state, &headers).await?;
    if !update.metadata.is_object() {
        return Err(ApiError::BadRequest("metadata must be a JSON object".to_string()));
    }

    store.update_metadata(&id, update.metadata).await?;
    Ok(Json(store.get_conversation(&id).await?))
}

/// Reject rows that could never be replayed.
fn validate_message(message: &NewMessage) -> Result<(), ApiError> {
    match message.role {
        Role::System => Err(ApiError::BadRequest(
            "system messages are not stored".to_string(),
        )),
        Role::User if message.content.is_none() => {
            Err(ApiError::BadRequest("user message requires content".to_string()))
        }
        Role::Tool
            if message
                .tool_call_id
                .as_deref()
                .map_or(true, |id| id.trim().is_empty()) =>
        {
            Err(ApiError::BadRequest("tool message requires tool_call_id".to_string()))
        }
        Role::Assistant
            if message.content.as_deref().map_or(true, str::is_empty)
                && message.tool_calls.as_ref().map_or(true, Vec::is_empty) =>
        {
            Err(ApiError::BadRequest(
                "assistant message requires content or tool_calls".to_string(),
            ))
        }
        _ if message.sequence_order < 0 => Err(ApiError::BadRequest(
            "sequence_order must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}
