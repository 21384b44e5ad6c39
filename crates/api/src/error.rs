//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use nudge_core::NudgeError;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by handlers.
///
/// Every variant renders as `{"error": ..., "details"?: ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The upstream provider could not be reached at all.
    #[error("failed to reach upstream: {0}")]
    UpstreamUnreachable(String),

    /// The upstream provider answered with a non-2xx status.
    #[error("upstream returned {status}")]
    Upstream { status: StatusCode, details: Value },

    /// The upstream provider answered 2xx with a body that is not JSON.
    #[error("invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Transcript store error.
    #[error("store error: {0}")]
    Store(#[from] NudgeError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Collapse storage errors onto the HTTP-level variants.
    fn classify(self) -> Self {
        match self {
            ApiError::Database(DatabaseError::NotFound { entity, .. }) => {
                ApiError::NotFound(entity.to_string())
            }
            ApiError::Database(err @ DatabaseError::AlreadyExists { .. }) => {
                ApiError::Conflict(err.to_string())
            }
            ApiError::Database(err) => ApiError::Internal(err.to_string()),
            ApiError::Store(NudgeError::ConversationNotFound(_)) => {
                ApiError::NotFound("Conversation".to_string())
            }
            ApiError::Store(NudgeError::Conflict(message)) => ApiError::Conflict(message),
            ApiError::Store(NudgeError::Unauthorized(_)) => ApiError::Unauthorized,
            ApiError::Store(err) => ApiError::Internal(err.to_string()),
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.classify() {
            ApiError::Unauthorized => {
                warn!("Unauthorized request");
                (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }))
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{} not found", what) }),
            ),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            ApiError::UpstreamUnreachable(details) => {
                warn!("Upstream unreachable: {}", details);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "Failed to reach upstream", "details": details }),
                )
            }
            ApiError::Upstream { status, details } => {
                warn!("Upstream returned {}", status);
                (
                    status,
                    json!({ "error": "Upstream request failed", "details": details }),
                )
            }
            ApiError::InvalidUpstreamResponse(details) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Invalid upstream response", "details": details }),
            ),
            other => {
                error!("Internal error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
