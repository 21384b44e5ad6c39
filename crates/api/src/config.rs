//! Server configuration.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8787";

/// Default upstream chat-completion endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model when the client does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:nudge.db?mode=rwc";

/// Configuration problems detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// Upstream provider key. Never leaves the server.
    pub upstream_api_key: String,
    /// Upstream chat-completion URL.
    pub upstream_url: String,
    /// Model used when the request names none.
    pub default_model: String,
    /// Temperature used when the request names none.
    pub default_temperature: f64,
    /// SQLite URL.
    pub database_url: String,
    /// Timeout for upstream requests.
    pub upstream_timeout_secs: u64,
}

impl ServerConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `NUDGE_UPSTREAM_API_KEY` - Upstream provider API key
    ///
    /// Optional environment variables:
    /// - `NUDGE_API_ADDR` - Listen address (default: 127.0.0.1:8787)
    /// - `NUDGE_UPSTREAM_URL` - Chat completions URL (default: OpenAI)
    /// - `NUDGE_DEFAULT_MODEL` - Model (default: gpt-4o-mini)
    /// - `NUDGE_DEFAULT_TEMPERATURE` - Temperature (default: 0.7)
    /// - `NUDGE_UPSTREAM_TIMEOUT_SECS` - Upstream timeout (default: 60)
    /// - `DATABASE_URL` - SQLite URL (default: sqlite:nudge.db?mode=rwc)
    pub fn from_env() -> Result<Self, ConfigError> {
        let upstream_api_key = env::var("NUDGE_UPSTREAM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("NUDGE_UPSTREAM_API_KEY"))?;

        let addr_raw = env::var("NUDGE_API_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let addr = addr_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "NUDGE_API_ADDR",
            value: addr_raw.clone(),
        })?;

        let upstream_url =
            env::var("NUDGE_UPSTREAM_URL").unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string());

        let default_model =
            env::var("NUDGE_DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let default_temperature = env::var("NUDGE_DEFAULT_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.7);

        let upstream_timeout_secs = env::var("NUDGE_UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            addr,
            upstream_api_key,
            upstream_url,
            default_model,
            default_temperature,
            database_url: database_url(),
            upstream_timeout_secs,
        })
    }

    /// Configuration pointing at a given upstream, for tests and embedding.
    pub fn for_upstream(upstream_url: impl Into<String>, upstream_api_key: impl Into<String>) -> Self {
        Self {
            addr: ([127, 0, 0, 1], 0).into(),
            upstream_api_key: upstream_api_key.into(),
            upstream_url: upstream_url.into(),
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: 0.7,
            database_url: "sqlite::memory:".to_string(),
            upstream_timeout_secs: 60,
        }
    }
}

/// `DATABASE_URL` or the default file database.
pub fn database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}
