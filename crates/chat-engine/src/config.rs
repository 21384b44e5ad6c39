//! Configuration for the conversation engine.

use nudge_core::{NudgeError, DEFAULT_SYSTEM_PROMPT};
use std::env;
use std::path::Path;

/// Default proxy base URL.
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8787";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default cap on consecutive tool rounds per submission.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Configuration for [`ConversationEngine`](crate::ConversationEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the authenticated proxy.
    pub proxy_url: String,

    /// Session token sent as a bearer credential.
    pub access_token: String,

    /// Model name forwarded with every request.
    pub model: String,

    /// System prompt placed first in every transcript.
    pub system_prompt: String,

    /// Optional assistant greeting shown before the first user message.
    pub greeting: Option<String>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tool rounds before a submission fails.
    pub max_tool_rounds: usize,

    /// HTTP timeout for gateway and store requests.
    pub http_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            access_token: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: None,
            temperature: 0.7,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            http_timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `NUDGE_ACCESS_TOKEN` - Session token issued by the proxy
    ///
    /// Optional environment variables:
    /// - `NUDGE_PROXY_URL` - Proxy URL (default: http://127.0.0.1:8787)
    /// - `NUDGE_MODEL` - Model name (default: gpt-4o-mini)
    /// - `NUDGE_SYSTEM_PROMPT` - System prompt (overrides prompt file)
    /// - `NUDGE_PROMPT_FILE` - Path to a system prompt file
    /// - `NUDGE_GREETING` - Assistant greeting
    /// - `NUDGE_TEMPERATURE` - Temperature (default: 0.7)
    /// - `NUDGE_MAX_TOOL_ROUNDS` - Tool round cap (default: 5)
    /// - `NUDGE_HTTP_TIMEOUT_SECS` - Request timeout (default: 60)
    ///
    /// System prompt priority:
    /// 1. `NUDGE_SYSTEM_PROMPT` env var (if set)
    /// 2. Contents of `NUDGE_PROMPT_FILE` (if it exists and is non-empty)
    /// 3. The built-in Nudge prompt
    pub fn from_env() -> Result<Self, NudgeError> {
        let access_token = env::var("NUDGE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| NudgeError::Configuration("NUDGE_ACCESS_TOKEN not set".to_string()))?;

        let proxy_url = env::var("NUDGE_PROXY_URL")
            .unwrap_or_else(|_| DEFAULT_PROXY_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = env::var("NUDGE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let system_prompt = if let Ok(prompt) = env::var("NUDGE_SYSTEM_PROMPT") {
            prompt
        } else {
            env::var("NUDGE_PROMPT_FILE")
                .ok()
                .and_then(load_prompt_file)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
        };

        let greeting = env::var("NUDGE_GREETING")
            .ok()
            .filter(|g| !g.trim().is_empty());

        let temperature = env::var("NUDGE_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.7);

        let max_tool_rounds = env::var("NUDGE_MAX_TOOL_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);

        let http_timeout_secs = env::var("NUDGE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            proxy_url,
            access_token,
            model,
            system_prompt,
            greeting,
            temperature,
            max_tool_rounds,
            http_timeout_secs,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Full URL of the chat proxy endpoint.
    pub fn chat_endpoint(&self) -> String {
        format!("{}/v1/chat", self.proxy_url)
    }

    /// Full URL of the conversations collection.
    pub fn conversations_endpoint(&self) -> String {
        format!("{}/v1/conversations", self.proxy_url)
    }
}

/// Builder for EngineConfig.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the proxy URL.
    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.config.proxy_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the access token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = token.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Set the greeting.
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.config.greeting = Some(greeting.into());
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = temp;
        self
    }

    /// Set the tool round cap.
    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.config.max_tool_rounds = rounds;
        self
    }

    /// Set the HTTP timeout in seconds.
    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs;
        self
    }

    /// Load the system prompt from a file.
    ///
    /// Missing or empty files leave the current prompt in place.
    pub fn load_prompt_file(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(prompt) = load_prompt_file(path) {
            self.config.system_prompt = prompt;
        }
        self
    }

    /// Build the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

/// Load a prompt file, returning None if not found or empty.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    match std::fs::read_to_string(path.as_ref()) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.proxy_url, "http://127.0.0.1:8787");
        assert!(config.access_token.is_empty());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(config.greeting.is_none());
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tool_rounds, 5);
        assert_eq!(config.http_timeout_secs, 60);
    }

    #[test]
    fn test_builder_all_options() {
        let config = EngineConfig::builder()
            .proxy_url("https://nudge.example.com/")
            .access_token("tok")
            .model("gpt-4o")
            .system_prompt("Be brief")
            .greeting("Hi!")
            .temperature(0.2)
            .max_tool_rounds(2)
            .http_timeout_secs(5)
            .build();

        assert_eq!(config.proxy_url, "https://nudge.example.com");
        assert_eq!(config.chat_endpoint(), "https://nudge.example.com/v1/chat");
        assert_eq!(
            config.conversations_endpoint(),
            "https://nudge.example.com/v1/conversations"
        );
        assert_eq!(config.access_token, "tok");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.system_prompt, "Be brief");
        assert_eq!(config.greeting.as_deref(), Some("Hi!"));
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tool_rounds, 2);
        assert_eq!(config.http_timeout_secs, 5);
    }

    #[test]
    fn test_builder_missing_prompt_file_keeps_prompt() {
        let config = EngineConfig::builder()
            .system_prompt("keep me")
            .load_prompt_file("/nonexistent/nudge-prompt.md")
            .build();
        assert_eq!(config.system_prompt, "keep me");
    }

    // Env vars are process-global, so all scenarios share one test.
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_all_nudge_vars() {
            for key in [
                "NUDGE_ACCESS_TOKEN",
                "NUDGE_PROXY_URL",
                "NUDGE_MODEL",
                "NUDGE_SYSTEM_PROMPT",
                "NUDGE_PROMPT_FILE",
                "NUDGE_GREETING",
                "NUDGE_TEMPERATURE",
                "NUDGE_MAX_TOOL_ROUNDS",
                "NUDGE_HTTP_TIMEOUT_SECS",
            ] {
                std::env::remove_var(key);
            }
        }

        // Missing token
        clear_all_nudge_vars();
        match EngineConfig::from_env() {
            Err(NudgeError::Configuration(msg)) => assert!(msg.contains("NUDGE_ACCESS_TOKEN")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }

        // Defaults
        clear_all_nudge_vars();
        std::env::set_var("NUDGE_ACCESS_TOKEN", "env-token");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.access_token, "env-token");
        assert_eq!(config.proxy_url, DEFAULT_PROXY_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.max_tool_rounds, 5);

        // Prompt file
        let prompt_path = std::env::temp_dir().join("nudge-engine-config-test-prompt.md");
        std::fs::write(&prompt_path, "  From file  \n").unwrap();
        std::env::set_var("NUDGE_PROMPT_FILE", &prompt_path);
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.system_prompt, "From file");

        // Explicit prompt wins over file, everything set
        std::env::set_var("NUDGE_SYSTEM_PROMPT", "From env");
        std::env::set_var("NUDGE_PROXY_URL", "http://localhost:9000/");
        std::env::set_var("NUDGE_MODEL", "gpt-4o");
        std::env::set_var("NUDGE_GREETING", "Hey there");
        std::env::set_var("NUDGE_TEMPERATURE", "0.3");
        std::env::set_var("NUDGE_MAX_TOOL_ROUNDS", "3");
        std::env::set_var("NUDGE_HTTP_TIMEOUT_SECS", "10");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.system_prompt, "From env");
        assert_eq!(config.proxy_url, "http://localhost:9000");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.greeting.as_deref(), Some("Hey there"));
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tool_rounds, 3);
        assert_eq!(config.http_timeout_secs, 10);

        let _ = std::fs::remove_file(&prompt_path);
        clear_all_nudge_vars();
    }
}
