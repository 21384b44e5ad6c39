//! Session issuing and lookup.

use std::time::Duration;

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DatabaseError, Result};
use crate::models::Session;

/// Issue a new session for `user_id`.
///
/// With `ttl` set the session stops validating after that long.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: &str,
    ttl: Option<Duration>,
) -> Result<Session> {
    let token = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    let expires_modifier = ttl.map(|ttl| format!("+{} seconds", ttl.as_secs()));

    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (token, user_id, expires_at)
        VALUES (?, ?, CASE WHEN ? IS NULL THEN NULL
                           ELSE strftime('%Y-%m-%d %H:%M:%f', 'now', ?) END)
        RETURNING token, user_id, created_at, expires_at
        "#,
    )
    .bind(&token)
    .bind(user_id)
    .bind(&expires_modifier)
    .bind(&expires_modifier)
    .fetch_one(pool)
    .await?;

    info!("Issued session for user {}", user_id);
    Ok(session)
}

/// Look up a session that has not expired.
pub async fn get_valid_session(pool: &SqlitePool, token: &str) -> Result<Session> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT token, user_id, created_at, expires_at
        FROM sessions
        WHERE token = ?
          AND (expires_at IS NULL OR expires_at > strftime('%Y-%m-%d %H:%M:%f', 'now'))
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Session",
        id: "<redacted>".to_string(),
    })
}

/// Revoke a session.
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE token = ?
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Session",
            id: "<redacted>".to_string(),
        });
    }

    Ok(())
}

/// Delete expired sessions, returning how many were removed.
pub async fn prune_expired(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE expires_at IS NOT NULL
          AND expires_at <= strftime('%Y-%m-%d %H:%M:%f', 'now')
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
