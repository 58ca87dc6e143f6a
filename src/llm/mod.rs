//! LLM integration for the mediator.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! rig-core handles HTTP transport; `RigAdapter` bridges rig's
//! `CompletionModel` to our `LlmProvider` trait. The pipeline only sees
//! `Arc<dyn LlmProvider>`, built once and injected into every stage.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::{JsonStyle, RigAdapter};

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Default model for this backend.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "MEDIATOR_LLM_BACKEND".to_string(),
                message: format!("unknown backend '{other}' (expected anthropic or openai)"),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Override the API base URL (proxies, local gateways). Anthropic takes
    /// the bare host; OpenAI includes the `/v1` prefix.
    pub base_url: Option<String>,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_provider(config),
        LlmBackend::OpenAi => create_openai_provider(config),
    }
}

fn client_error(provider: &str, e: impl Display) -> LlmError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: format!("Failed to create {provider} client: {e}"),
    }
}

fn create_anthropic_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::anthropic;

    let key = config.api_key.expose_secret();
    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        match config.base_url.as_deref() {
            Some(url) => anthropic::Client::builder()
                .api_key(key)
                .base_url(url.trim_end_matches('/'))
                .build()
                .map_err(|e| client_error("anthropic", e))?,
            None => anthropic::Client::new(key).map_err(|e| client_error("anthropic", e))?,
        };

    let model = client.completion_model(&config.model);
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(
        RigAdapter::new(model, &config.model, "anthropic").with_json_style(JsonStyle::Prefill),
    ))
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let key = config.api_key.expose_secret();
    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        match config.base_url.as_deref() {
            Some(url) => openai::Client::builder()
                .api_key(key)
                .base_url(url.trim_end_matches('/'))
                .build()
                .map_err(|e| client_error("openai", e))?,
            None => openai::Client::new(key).map_err(|e| client_error("openai", e))?,
        };

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model, "openai")))
}
