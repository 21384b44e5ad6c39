#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use api::{router, AppState, ServerConfig};
use axum::extract::{Json, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use database::{session, Database};
use serde_json::{json, Value};

/// Scripted stand-in for the upstream chat-completion provider.
#[derive(Clone, Default)]
pub struct Upstream {
    responses: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
    received: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Upstream {
    pub fn new(responses: Vec<(StatusCode, Value)>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            received: Arc::default(),
        }
    }

    /// Authorization header and body of every request received.
    pub fn received(&self) -> Vec<(Option<String>, Value)> {
        self.received.lock().unwrap().clone()
    }
}

async fn upstream_handler(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    upstream.received.lock().unwrap().push((auth, body));

    let next = upstream.responses.lock().unwrap().pop_front();
    match next {
        Some((status, body)) => (status, Json(body)),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "script exhausted" } })),
        ),
    }
}

pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub struct TestServer {
    pub base: String,
    pub db: Database,
    pub upstream: Upstream,
}

impl TestServer {
    pub async fn start(responses: Vec<(StatusCode, Value)>) -> Self {
        let upstream = Upstream::new(responses);
        let upstream_addr = spawn(
            Router::new()
                .route("/v1/chat/completions", post(upstream_handler))
                .with_state(upstream.clone()),
        )
        .await;

        Self::start_with_upstream_url(
            format!("http://{}/v1/chat/completions", upstream_addr),
            upstream,
        )
        .await
    }

    pub async fn start_with_upstream_url(upstream_url: String, upstream: Upstream) -> Self {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();

        let config = ServerConfig::for_upstream(upstream_url, "sk-upstream");
        let state = AppState::new(config, db.clone()).unwrap();
        let addr = spawn(router(state)).await;

        Self {
            base: format!("http://{}", addr),
            db,
            upstream,
        }
    }

    pub async fn token(&self, user: &str) -> String {
        session::create_session(self.db.pool(), user, None)
            .await
            .unwrap()
            .token
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub fn completion(message: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

pub fn text_completion(text: &str) -> Value {
    completion(json!({ "role": "assistant", "content": text }))
}

pub fn tool_completion(id: &str, name: &str, arguments: &str) -> Value {
    completion(json!({
        "role": "assistant",
        "content": null,
        "tool_calls": [{
            "id": id,
            "type": "function",
            "function": { "name": name, "arguments": arguments }
        }]
    }))
}
