//! Conversation CRUD, always scoped to an owner.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Conversation;

fn not_found(id: &str) -> DatabaseError {
    DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    }
}

/// Create an empty conversation for `owner_id`.
pub async fn create_conversation(pool: &SqlitePool, owner_id: &str) -> Result<Conversation> {
    let id = uuid::Uuid::new_v4().to_string();

    let conversation = sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (id, owner_id)
        VALUES (?, ?)
        RETURNING id, owner_id, metadata, created_at, updated_at
        "#,
    )
    .bind(&id)
    .bind(owner_id)
    .fetch_one(pool)
    .await?;

    Ok(conversation)
}

/// Get one conversation owned by `owner_id`.
pub async fn get_conversation(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<Conversation> {
    sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, owner_id, metadata, created_at, updated_at
        FROM conversations
        WHERE id = ? AND owner_id = ?
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// List an owner's conversations, most recently active first.
pub async fn list_conversations(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Conversation>> {
    let conversations = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, owner_id, metadata, created_at, updated_at
        FROM conversations
        WHERE owner_id = ?
        ORDER BY updated_at DESC, rowid DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(conversations)
}

/// Replace the metadata object.
pub async fn update_metadata(
    pool: &SqlitePool,
    owner_id: &str,
    id: &str,
    metadata: &Value,
) -> Result<Conversation> {
    let encoded = serde_json::to_string(metadata)?;

    sqlx::query_as::<_, Conversation>(
        r#"
        UPDATE conversations
        SET metadata = ?, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
        WHERE id = ? AND owner_id = ?
        RETURNING id, owner_id, metadata, created_at, updated_at
        "#,
    )
    .bind(encoded)
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Delete a conversation; its messages go with it.
pub async fn delete_conversation(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM conversations
        WHERE id = ? AND owner_id = ?
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    Ok(())
}
