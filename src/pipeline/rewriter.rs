//! Rewrite generation and deterministic summaries.
//!
//! `RewriteGenerator` asks the model for style variants of a message,
//! conditioned on the classifier output. Anything that fails to parse is
//! dropped; a total failure yields no suggestions rather than an error.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::json;
use crate::pipeline::types::{EmotionAnalysis, RiskAssessment, RiskLevel, TransformSuggestion};

pub const SUMMARY_CRITICAL: &str =
    "⚠️ このメッセージは相手を強く傷つける可能性があります。送信前に必ず表現を見直してください。";
pub const SUMMARY_HIGH: &str =
    "注意: 攻撃的に受け取られる可能性があります。言い換えの提案を確認してください。";
pub const SUMMARY_MEDIUM: &str = "より伝わりやすい表現の提案があります。";
pub const SUMMARY_LOW: &str = "適切なトーンです。";

/// Configuration for rewrite generation.
#[derive(Debug, Clone)]
pub struct RewriterConfig {
    /// Maximum number of suggestions kept from one response.
    pub max_suggestions: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            temperature: 0.7,
            max_tokens: 1536,
        }
    }
}

const REWRITE_SYSTEM_PROMPT: &str = "\
You help employees and managers rephrase workplace chat messages so they land well, \
using Nonviolent Communication (observation, feeling, need, request).

Write exactly three rewrites of the message, in the message's own language, one per style:
- \"factual\": neutral, sticks to observable facts and the concrete ask
- \"supportive\": warm, acknowledges the other person's situation
- \"collaborative\": frames the issue as a shared problem to solve together

Keep the sender's intent and every concrete fact (dates, tasks, numbers). Do not add promises \
or information that is not in the original.

Respond with ONLY a JSON object:
{\"suggestions\": [{\"style\": \"factual\", \"transformedText\": \"...\", \"rationale\": \"...\", \
\"nvc\": {\"observation\": \"...\", \"feeling\": \"...\", \"need\": \"...\", \"request\": \"...\"}}]}";

/// Top-level response shape; elements are validated one at a time.
#[derive(Debug, Deserialize)]
struct RewriteResponse {
    #[serde(default)]
    suggestions: Vec<serde_json::Value>,
}

/// Generates style-variant rewrites with an LLM.
pub struct RewriteGenerator {
    llm: Arc<dyn LlmProvider>,
    config: RewriterConfig,
}

impl RewriteGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: RewriterConfig) -> Self {
        Self { llm, config }
    }

    /// Produce rewrite suggestions. Empty on any failure.
    pub async fn generate(
        &self,
        message: &str,
        emotion: &EmotionAnalysis,
        risk: &RiskAssessment,
    ) -> Vec<TransformSuggestion> {
        match self.try_generate(message, emotion, risk).await {
            Ok(suggestions) => {
                info!(count = suggestions.len(), "Generated rewrite suggestions");
                suggestions
            }
            Err(e) => {
                warn!(error = %e, "Rewrite generation failed, returning no suggestions");
                Vec::new()
            }
        }
    }

    async fn try_generate(
        &self,
        message: &str,
        emotion: &EmotionAnalysis,
        risk: &RiskAssessment,
    ) -> Result<Vec<TransformSuggestion>, PipelineError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(REWRITE_SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(message, emotion, risk)?),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
        .with_json_mode();

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| PipelineError::Rewrite(format!("LLM call failed: {e}")))?;

        let parsed: RewriteResponse = json::decode(&response.content)?;
        Ok(parse_suggestions(parsed.suggestions, self.config.max_suggestions))
    }
}

/// Validate each element independently, dropping the bad ones.
fn parse_suggestions(raw: Vec<serde_json::Value>, max: usize) -> Vec<TransformSuggestion> {
    raw.into_iter()
        .filter_map(|value| {
            let parsed = serde_json::from_value::<TransformSuggestion>(value)
                .map_err(|e| e.to_string())
                .and_then(|s| s.validate().map_err(|e| e.to_string()));
            match parsed {
                Ok(s) => Some(s),
                Err(reason) => {
                    debug!(reason = %reason, "Dropping invalid rewrite suggestion");
                    None
                }
            }
        })
        .take(max)
        .collect()
}

fn build_user_prompt(
    message: &str,
    emotion: &EmotionAnalysis,
    risk: &RiskAssessment,
) -> Result<String, PipelineError> {
    let emotion_json =
        serde_json::to_string(emotion).map_err(|e| PipelineError::Rewrite(e.to_string()))?;
    let risk_json =
        serde_json::to_string(risk).map_err(|e| PipelineError::Rewrite(e.to_string()))?;
    Ok(format!(
        "Original message:\n{message}\n\nEmotion analysis:\n{emotion_json}\n\nRisk assessment:\n{risk_json}"
    ))
}

/// Fixed one-line summary for a risk level. No model call.
pub fn quick_summary(risk: &RiskAssessment) -> &'static str {
    match risk.risk_level {
        RiskLevel::Critical => SUMMARY_CRITICAL,
        RiskLevel::High => SUMMARY_HIGH,
        RiskLevel::Medium => SUMMARY_MEDIUM,
        RiskLevel::Low => SUMMARY_LOW,
    }
}
