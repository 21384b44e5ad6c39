//! Nudge API server.
//!
//! An authenticated reverse proxy to an upstream chat-completion provider,
//! plus the conversation persistence endpoints the client stores its
//! transcript through. Every route except `/health` needs a bearer session
//! token issued with `api issue-session`.

pub mod auth;
pub mod config;
pub mod conversations;
pub mod error;
pub mod proxy;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Json;
use axum::routing::{get, post, put};
use axum::Router;
use database::Database;
use serde::Serialize;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub http: reqwest::Client,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, db: Database) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        Ok(Self {
            db,
            http,
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// All routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(proxy::chat))
        .route(
            "/v1/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/v1/conversations/:id",
            get(conversations::get).delete(conversations::delete),
        )
        .route(
            "/v1/conversations/:id/messages",
            get(conversations::list_messages).post(conversations::save_message),
        )
        .route(
            "/v1/conversations/:id/metadata",
            put(conversations::update_metadata),
        )
        .with_state(state)
}
