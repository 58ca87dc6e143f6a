//! Bridges rig's `CompletionModel` to the mediator's `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message};
use serde::Serialize;

use crate::error::LlmError;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

/// Anthropic rejects requests without `max_tokens` for models rig doesn't know.
const DEFAULT_MAX_TOKENS: u64 = 1024;

/// Assistant turn used to force a JSON object reply.
const JSON_PREFILL: &str = "{";

const JSON_INSTRUCTION: &str =
    "Respond with a single JSON object and nothing else: no prose, no code fences.";

/// How a backend is pushed into answering with a bare JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    /// End the conversation with an assistant turn holding `{`.
    Prefill,
    /// Append a JSON-only instruction to the system prompt.
    Instruction,
}

/// `LlmProvider` backed by any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
    json_style: JsonStyle,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
            json_style: JsonStyle::Instruction,
        }
    }

    pub fn with_json_style(mut self, style: JsonStyle) -> Self {
        self.json_style = style;
        self
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
    M::Response: Serialize,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prefill = request.json_mode && self.json_style == JsonStyle::Prefill;

        let mut preamble = request.system_prompt();
        if request.json_mode && self.json_style == JsonStyle::Instruction {
            preamble = Some(match preamble {
                Some(p) => format!("{p}\n\n{JSON_INSTRUCTION}"),
                None => JSON_INSTRUCTION.to_string(),
            });
        }

        let mut turns: Vec<Message> = request
            .messages
            .iter()
            .filter_map(|m| match m.role {
                Role::System => None,
                Role::User => Some(Message::user(m.content.clone())),
                Role::Assistant => Some(Message::assistant(m.content.clone())),
            })
            .collect();
        if prefill {
            turns.push(Message::assistant(JSON_PREFILL));
        }
        let prompt = turns.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: "request has no user turn".to_string(),
        })?;

        let mut builder = self
            .model
            .completion_request(prompt)
            .messages(turns)
            .max_tokens(request.max_tokens.map_or(DEFAULT_MAX_TOKENS, u64::from));
        if let Some(system) = preamble {
            builder = builder.preamble(system);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_completion_error(self.provider, e))?;

        let text = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "response contained no text".to_string(),
            });
        }

        let raw = serde_json::to_value(&response.raw_response).unwrap_or_default();
        let (finish_reason, response_id) = raw_metadata(&raw);

        tracing::debug!(
            provider = self.provider,
            model = %self.model_name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion finished"
        );

        Ok(CompletionResponse {
            content: if prefill { restore_prefill(&text) } else { text },
            input_tokens: saturate(response.usage.input_tokens),
            output_tokens: saturate(response.usage.output_tokens),
            finish_reason,
            response_id,
        })
    }
}

/// Put the prefilled brace back unless the model already repeated it.
fn restore_prefill(text: &str) -> String {
    if text.trim_start().starts_with(JSON_PREFILL) {
        text.to_string()
    } else {
        format!("{JSON_PREFILL}{text}")
    }
}

fn saturate(tokens: u64) -> u32 {
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

/// Stop reason and id from the provider's raw response body.
///
/// Anthropic reports `stop_reason`; OpenAI chat reports
/// `choices[0].finish_reason`, the Responses API a `status`.
fn raw_metadata(raw: &serde_json::Value) -> (FinishReason, Option<String>) {
    let reason = raw
        .get("stop_reason")
        .and_then(|v| v.as_str())
        .or_else(|| {
            raw.pointer("/choices/0/finish_reason")
                .and_then(|v| v.as_str())
        })
        .or_else(|| match raw.get("status").and_then(|v| v.as_str()) {
            Some("completed") => Some("stop"),
            Some("incomplete") => Some("length"),
            _ => None,
        });
    let id = raw.get("id").and_then(|v| v.as_str()).map(str::to_string);
    (FinishReason::from_provider(reason), id)
}

/// Map a rig error onto `LlmError`.
///
/// rig surfaces non-2xx replies as text carrying the provider's error body
/// or the HTTP status, so the classification keys off both.
fn map_completion_error(provider: &str, error: CompletionError) -> LlmError {
    let provider = provider.to_string();
    match error {
        CompletionError::JsonError(e) => LlmError::InvalidResponse {
            provider,
            reason: e.to_string(),
        },
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse { provider, reason },
        other => {
            let reason = other.to_string();
            let lower = reason.to_lowercase();
            if [
                "authentication_error",
                "permission_error",
                "invalid_api_key",
                "invalid x-api-key",
                "401 unauthorized",
                "403 forbidden",
            ]
            .iter()
            .any(|needle| lower.contains(needle))
            {
                LlmError::AuthFailed { provider }
            } else if ["rate_limit", "429 too many requests"]
                .iter()
                .any(|needle| lower.contains(needle))
            {
                LlmError::RateLimited {
                    provider,
                    retry_after: None,
                }
            } else {
                let reason: String = reason.chars().take(300).collect();
                LlmError::RequestFailed { provider, reason }
            }
        }
    }
}
