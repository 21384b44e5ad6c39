//! Model gateway: the authenticated `/v1/chat` proxy endpoint.

use std::sync::Arc;
use std::time::Duration;

use nudge_core::{async_trait, NudgeError};
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::api_types::{ApiError, ChatCompletionRequest, ChatCompletionResponse};
use crate::config::EngineConfig;

/// Anything that can answer a chat completion request.
///
/// The engine only ever talks to the model through this trait, which keeps
/// it testable against a scripted gateway.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send one request and return the decoded completion.
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NudgeError>;
}

#[async_trait]
impl<T: ModelGateway + ?Sized> ModelGateway for Arc<T> {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NudgeError> {
        (**self).complete(request).await
    }
}

/// Gateway that POSTs to the proxy with a bearer session token.
pub struct HttpGateway {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl HttpGateway {
    /// Create a gateway for the proxy described by `config`.
    pub fn new(config: &EngineConfig) -> Result<Self, NudgeError> {
        if config.access_token.trim().is_empty() {
            return Err(NudgeError::Unauthorized("no access token".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| {
                NudgeError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!("HttpGateway initialized for {}", config.chat_endpoint());

        Ok(Self {
            client,
            endpoint: config.chat_endpoint(),
            access_token: config.access_token.clone(),
        })
    }

    /// Endpoint this gateway posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NudgeError> {
        debug!(
            "Sending {} message(s) to {} (model: {})",
            request.messages.len(),
            self.endpoint,
            request.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| NudgeError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NudgeError::Network(format!("Failed to read response: {}", e)))?;

        interpret_response(status, &body)
    }
}

/// Map a proxy response onto the engine's error taxonomy.
pub(crate) fn interpret_response(
    status: StatusCode,
    body: &str,
) -> Result<ChatCompletionResponse, NudgeError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(NudgeError::Unauthorized(error_message(body)));
    }

    if !status.is_success() {
        return Err(NudgeError::Upstream {
            status: status.as_u16(),
            message: error_message(body),
        });
    }

    serde_json::from_str(body)
        .map_err(|e| NudgeError::MalformedResponse(format!("Failed to parse response: {}", e)))
}

/// Best-effort extraction of a readable error from a response body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.message(),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
