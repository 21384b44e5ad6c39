//! Bearer session authentication.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use database::{session, DatabaseError, Session};

use crate::error::ApiError;
use crate::AppState;

/// Resolve the request's bearer token to a live session.
pub async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(ApiError::Unauthorized);
    };

    let Ok(value) = value.to_str() else {
        return Err(ApiError::Unauthorized);
    };

    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    match session::get_valid_session(state.db.pool(), token).await {
        Ok(session) => Ok(session),
        Err(DatabaseError::NotFound { .. }) => Err(ApiError::Unauthorized),
        Err(err) => Err(err.into()),
    }
}
