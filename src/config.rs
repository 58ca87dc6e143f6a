//! Configuration types.
//!
//! Everything is read from environment variables at startup.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::pipeline::gateway::ProcessOptions;
use crate::pipeline::rewriter::RewriterConfig;

/// Mediator configuration.
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    pub llm: LlmConfig,
    /// Defaults applied to every message.
    pub options: ProcessOptions,
    pub rewriter: RewriterConfig,
}

impl MediatorConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("MEDIATOR_LLM_BACKEND") {
            Some(value) => value.parse::<LlmBackend>()?,
            None => LlmBackend::Anthropic,
        };

        let key_var = backend.api_key_var();
        let api_key = lookup(key_var)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = lookup("MEDIATOR_MODEL").unwrap_or_else(|| backend.default_model().to_string());
        let base_url = lookup("MEDIATOR_LLM_BASE_URL").filter(|u| !u.trim().is_empty());

        let defaults = ProcessOptions::default();
        let options = ProcessOptions {
            min_message_length: parse_or(
                &lookup,
                "MEDIATOR_MIN_MESSAGE_LENGTH",
                defaults.min_message_length,
            )?,
            force_analysis: parse_or(&lookup, "MEDIATOR_FORCE_ANALYSIS", defaults.force_analysis)?,
            context: None,
        };

        let rewriter_defaults = RewriterConfig::default();
        let rewriter = RewriterConfig {
            max_suggestions: parse_or(
                &lookup,
                "MEDIATOR_MAX_SUGGESTIONS",
                rewriter_defaults.max_suggestions,
            )?,
            ..rewriter_defaults
        };

        Ok(Self {
            llm: LlmConfig {
                backend,
                api_key: secrecy::SecretString::from(api_key),
                model,
                base_url,
            },
            options,
            rewriter,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(default),
    }
}
