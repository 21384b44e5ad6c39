//! Database error types.

use nudge_core::NudgeError;
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded
    #[error("invalid JSON column: {0}")]
    Json(#[from] serde_json::Error),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Record already exists
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

impl From<DatabaseError> for NudgeError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound {
                entity: "Conversation",
                id,
            } => NudgeError::ConversationNotFound(id),
            err @ DatabaseError::AlreadyExists { .. } => NudgeError::Conflict(err.to_string()),
            other => NudgeError::Storage(other.to_string()),
        }
    }
}

/// Map a unique-constraint violation onto `AlreadyExists`.
pub(crate) fn unique_violation(err: sqlx::Error, entity: &'static str, id: String) -> DatabaseError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return DatabaseError::AlreadyExists { entity, id };
        }
    }
    DatabaseError::Sqlx(err)
}
