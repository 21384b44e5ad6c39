//! `POST /v1/chat`: authenticated pass-through to the upstream provider.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::auth::authorize;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::AppState;

/// Body accepted from clients.
///
/// Messages and tool schemas are forwarded as opaque JSON.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyRequest {
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
    /// Legacy function schema; ignored when `tools` is present.
    #[serde(default)]
    pub functions: Option<Vec<Value>>,
}

/// Build the upstream body, filling in server defaults.
pub fn upstream_body(request: ProxyRequest, config: &ServerConfig) -> Value {
    let model = request
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| config.default_model.clone());
    let temperature = request.temperature.unwrap_or(config.default_temperature);

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model));
    body.insert("messages".to_string(), Value::Array(request.messages));
    body.insert("temperature".to_string(), json!(temperature));

    match (request.tools, request.functions) {
        (Some(tools), _) if !tools.is_empty() => {
            body.insert("tools".to_string(), Value::Array(tools));
        }
        (_, Some(functions)) if !functions.is_empty() => {
            body.insert("functions".to_string(), Value::Array(functions));
        }
        _ => {}
    }

    Value::Object(body)
}

/// The body is parsed only after the session checks out.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let session = authorize(&state, &headers).await?;

    let payload: ProxyRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e)))?;

    if payload.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }

    let body = upstream_body(payload, &state.config);
    info!(
        "Proxying chat for user {} ({} messages, model {})",
        session.user_id,
        body["messages"].as_array().map_or(0, |m| m.len()),
        body["model"]
    );

    let response = state
        .http
        .post(&state.config.upstream_url)
        .bearer_auth(&state.config.upstream_api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    if !status.is_success() {
        let details = serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        return Err(ApiError::Upstream { status, details });
    }

    if serde_json::from_slice::<Value>(&bytes).is_err() {
        return Err(ApiError::InvalidUpstreamResponse(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
    }

    debug!("Upstream returned {} bytes", bytes.len());
    Ok((StatusCode::OK, [(CONTENT_TYPE, "application/json")], bytes).into_response())
}
