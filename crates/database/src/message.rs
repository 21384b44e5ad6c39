//! Transcript rows.

use nudge_core::NewMessage;
use sqlx::SqlitePool;

use crate::error::{unique_violation, DatabaseError, Result};
use crate::models::MessageRecord;

/// Append a message to a conversation owned by `owner_id`.
///
/// Bumps the conversation's `updated_at`. A reused `sequence_order` is
/// rejected with [`DatabaseError::AlreadyExists`].
pub async fn insert_message(
    pool: &SqlitePool,
    owner_id: &str,
    conversation_id: &str,
    message: &NewMessage,
) -> Result<MessageRecord> {
    let tool_calls = match &message.tool_calls {
        Some(calls) if !calls.is_empty() => Some(serde_json::to_string(calls)?),
        _ => None,
    };

    let mut tx = pool.begin().await?;

    let touched = sqlx::query(
        r#"
        UPDATE conversations
        SET updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
        WHERE id = ? AND owner_id = ?
        "#,
    )
    .bind(conversation_id)
    .bind(owner_id)
    .execute(&mut *tx)
    .await?;

    if touched.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: conversation_id.to_string(),
        });
    }

    let record = sqlx::query_as::<_, MessageRecord>(
        r#"
        INSERT INTO messages (conversation_id, role, content, tool_calls, tool_call_id, sequence_order)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, conversation_id, role, content, tool_calls, tool_call_id, sequence_order, created_at
        "#,
    )
    .bind(conversation_id)
    .bind(message.role.as_str())
    .bind(&message.content)
    .bind(&tool_calls)
    .bind(&message.tool_call_id)
    .bind(message.sequence_order)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        unique_violation(
            e,
            "Message",
            format!("{}#{}", conversation_id, message.sequence_order),
        )
    })?;

    tx.commit().await?;
    Ok(record)
}

/// Messages of a conversation ordered by `sequence_order`.
pub async fn list_messages(
    pool: &SqlitePool,
    owner_id: &str,
    conversation_id: &str,
) -> Result<Vec<MessageRecord>> {
    // Distinguish "not yours / missing" from "empty".
    crate::conversation::get_conversation(pool, owner_id, conversation_id).await?;

    let records = sqlx::query_as::<_, MessageRecord>(
        r#"
        SELECT m.id, m.conversation_id, m.role, m.content, m.tool_calls,
               m.tool_call_id, m.sequence_order, m.created_at
        FROM messages m
        JOIN conversations c ON c.id = m.conversation_id
        WHERE m.conversation_id = ? AND c.owner_id = ?
        ORDER BY m.sequence_order ASC
        "#,
    )
    .bind(conversation_id)
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
