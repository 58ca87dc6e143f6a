//! Emotion and risk classification.
//!
//! Two independent model calls run concurrently: an emotional read on
//! Russell's circumplex and a workplace-aggression risk score. Each call
//! degrades to its own fallback on transport, parse or validation failure,
//! so `analyze` always returns both halves.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::json;
use crate::pipeline::types::{EmotionAnalysis, RiskAssessment};

/// Max characters of conversational context forwarded to the model.
const CONTEXT_CHARS: usize = 1500;

/// Tunables for the classification calls.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 512,
        }
    }
}

/// Joined output of both classification calls.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageAnalysis {
    pub emotion: EmotionAnalysis,
    pub risk: RiskAssessment,
}

const EMOTION_SYSTEM_PROMPT: &str = "\
You are an emotion analyst for workplace chat messages, using Russell's Circumplex Model of Affect.

Score the message on:
- valence: -1.0 (very negative) to 1.0 (very positive)
- arousal: 0.0 (calm, low energy) to 1.0 (agitated, high energy)
- emotions: one or more labels from exactly this list:
  joy, gratitude, trust, calm, neutral, surprise, confusion, anxiety, sadness, frustration, anger, contempt
- confidence: 0.0 to 1.0, how sure you are of this reading

Messages are usually Japanese. Read tone, not just vocabulary.

Respond with ONLY a JSON object:
{\"valence\": 0.0, \"arousal\": 0.0, \"emotions\": [\"neutral\"], \"confidence\": 0.0}";

const RISK_SYSTEM_PROMPT: &str = "\
You assess workplace messages for aggression and harm to psychological safety, \
the way a harassment-prevention officer would.

Return:
- aggressionScore: integer 0 (none) to 100 (abusive, threatening)
- psychSafetyImpact: -10.0 (severely damages the recipient's sense of safety) to 10.0 (strongly builds it)
- riskLevel: one of \"low\", \"medium\", \"high\", \"critical\"
  low: respectful; medium: curt or blaming; high: hostile, demeaning; critical: abusive, threatening, identity attacks
- concerns: short strings naming specific problems (empty array if none)

Respond with ONLY a JSON object:
{\"aggressionScore\": 0, \"psychSafetyImpact\": 0.0, \"riskLevel\": \"low\", \"concerns\": []}";

/// Runs the emotion and risk classification calls.
pub struct EmotionRiskClassifier {
    llm: Arc<dyn LlmProvider>,
    config: ClassifierConfig,
}

impl EmotionRiskClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, config: ClassifierConfig) -> Self {
        Self { llm, config }
    }

    /// Run both classifications concurrently and wait for both.
    pub async fn analyze(&self, message: &str, context: Option<&str>) -> MessageAnalysis {
        let (emotion, risk) = tokio::join!(
            self.analyze_emotion(message, context),
            self.assess_risk(message, context)
        );

        debug!(
            valence = emotion.valence,
            arousal = emotion.arousal,
            risk_level = risk.risk_level.label(),
            aggression = risk.aggression_score,
            "Classification complete"
        );

        MessageAnalysis { emotion, risk }
    }

    /// Emotional read of the message. Never fails.
    pub async fn analyze_emotion(&self, message: &str, context: Option<&str>) -> EmotionAnalysis {
        let result = self
            .classify::<EmotionAnalysis>(EMOTION_SYSTEM_PROMPT, message, context)
            .await
            .and_then(|e| e.validate().map_err(PipelineError::from));

        result.unwrap_or_else(|e| {
            warn!(error = %e, "Emotion analysis failed, using fallback");
            EmotionAnalysis::fallback()
        })
    }

    /// Aggression and psychological-safety assessment. Never fails.
    pub async fn assess_risk(&self, message: &str, context: Option<&str>) -> RiskAssessment {
        let result = self
            .classify::<RiskAssessment>(RISK_SYSTEM_PROMPT, message, context)
            .await
            .and_then(|r| r.validate().map_err(PipelineError::from));

        result.unwrap_or_else(|e| {
            warn!(error = %e, "Risk assessment failed, using cautious fallback");
            RiskAssessment::fallback()
        })
    }

    async fn classify<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        message: &str,
        context: Option<&str>,
    ) -> Result<T, PipelineError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(build_user_prompt(message, context)),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
        .with_json_mode();

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| PipelineError::Classification(format!("LLM call failed: {e}")))?;

        json::decode(&response.content).map_err(|e| {
            debug!(raw_response = %response.content, "Unparseable classification response");
            PipelineError::Schema(e)
        })
    }
}

fn build_user_prompt(message: &str, context: Option<&str>) -> String {
    let mut prompt = String::with_capacity(message.len() + 64);
    if let Some(ctx) = context.map(str::trim).filter(|c| !c.is_empty()) {
        // Keep the most recent part of the conversation.
        let total = ctx.chars().count();
        let recent: String = ctx.chars().skip(total.saturating_sub(CONTEXT_CHARS)).collect();
        prompt.push_str("Conversation so far:\n");
        prompt.push_str(&recent);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Message:\n");
    prompt.push_str(message);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::LlmError;
    use crate::llm::provider::{CompletionResponse, FinishReason};
    use crate::pipeline::types::{Emotion, RiskLevel};

    /// Answers emotion and risk prompts separately; `None` simulates a transport error.
    struct SplitLlm {
        emotion: Option<&'static str>,
        risk: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl SplitLlm {
        fn new(emotion: Option<&'static str>, risk: Option<&'static str>) -> Self {
            Self {
                emotion,
                risk,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for SplitLlm {
        fn model_name(&self) -> &str {
            "mock-split"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(request.json_mode);
            let system = request.system_prompt().unwrap_or_default();
            let answer = if system.contains("Circumplex") {
                self.emotion
            } else {
                self.risk
            };
            match answer {
                Some(content) => Ok(CompletionResponse {
                    content: content.to_string(),
                    input_tokens: 0,
                    output_tokens: 0,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "connection reset".into(),
                }),
            }
        }
    }

    const EMOTION_OK: &str =
        r#"{"valence": -0.7, "arousal": 0.9, "emotions": ["anger", "frustration"], "confidence": 0.85}"#;
    const RISK_OK: &str = r#"{"aggressionScore": 85, "psychSafetyImpact": -7.5, "riskLevel": "critical", "concerns": ["威圧的な命令口調"]}"#;

    fn classifier(llm: SplitLlm) -> (EmotionRiskClassifier, Arc<SplitLlm>) {
        let llm = Arc::new(llm);
        (
            EmotionRiskClassifier::new(llm.clone(), ClassifierConfig::default()),
            llm,
        )
    }

    #[tokio::test]
    async fn analyze_parses_both_calls() {
        let (classifier, llm) = classifier(SplitLlm::new(Some(EMOTION_OK), Some(RISK_OK)));
        let analysis = classifier.analyze("やる気がないなら帰れ！", None).await;

        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert_eq!(analysis.emotion.emotions, vec![Emotion::Anger, Emotion::Frustration]);
        assert_eq!(analysis.risk.risk_level, RiskLevel::Critical);
        assert_eq!(analysis.risk.aggression_score, 85);
    }

    /// Blocks every call until a second call arrives.
    struct RendezvousLlm {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl LlmProvider for RendezvousLlm {
        fn model_name(&self) -> &str {
            "mock-rendezvous"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.barrier.wait().await;
            let system = request.system_prompt().unwrap_or_default();
            let content = if system.contains("Circumplex") {
                EMOTION_OK
            } else {
                RISK_OK
            };
            Ok(CompletionResponse {
                content: content.to_string(),
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    #[tokio::test]
    async fn emotion_and_risk_calls_are_in_flight_together() {
        let llm = Arc::new(RendezvousLlm {
            barrier: tokio::sync::Barrier::new(2),
        });
        let classifier = EmotionRiskClassifier::new(llm, ClassifierConfig::default());

        let analysis = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            classifier.analyze("やる気がないなら帰れ！", None),
        )
        .await
        .expect("both classifier calls must be issued before either completes");

        assert_eq!(analysis.emotion.emotions, vec![Emotion::Anger, Emotion::Frustration]);
        assert_eq!(analysis.risk.risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn unparseable_risk_falls_back_to_medium() {
        let (classifier, _) = classifier(SplitLlm::new(Some(EMOTION_OK), Some("I'm not sure.")));
        let analysis = classifier.analyze("message", None).await;

        // Emotion half is unaffected by the risk failure.
        assert_eq!(analysis.emotion.valence, -0.7);
        assert_eq!(analysis.risk, RiskAssessment::fallback());
        assert_eq!(analysis.risk.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.risk.aggression_score, 50);
    }

    #[tokio::test]
    async fn transport_error_on_emotion_falls_back() {
        let (classifier, _) = classifier(SplitLlm::new(None, Some(RISK_OK)));
        let analysis = classifier.analyze("message", None).await;

        assert_eq!(analysis.emotion, EmotionAnalysis::fallback());
        assert_eq!(analysis.risk.risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn out_of_range_values_fall_back() {
        let (classifier, _) = classifier(SplitLlm::new(
            Some(r#"{"valence": 3.0, "arousal": 0.5, "emotions": ["joy"], "confidence": 0.5}"#),
            Some(r#"{"aggressionScore": 140, "psychSafetyImpact": 0, "riskLevel": "low", "concerns": []}"#),
        ));
        let analysis = classifier.analyze("message", None).await;

        assert_eq!(analysis.emotion, EmotionAnalysis::fallback());
        assert_eq!(analysis.risk, RiskAssessment::fallback());
    }

    #[tokio::test]
    async fn unknown_enum_values_fall_back() {
        let (classifier, _) = classifier(SplitLlm::new(
            Some(r#"{"valence": 0.1, "arousal": 0.2, "emotions": ["boredom"], "confidence": 0.5}"#),
            Some(r#"{"aggressionScore": 10, "psychSafetyImpact": 1, "riskLevel": "severe", "concerns": []}"#),
        ));
        let analysis = classifier.analyze("message", None).await;

        assert_eq!(analysis.emotion, EmotionAnalysis::fallback());
        assert_eq!(analysis.risk, RiskAssessment::fallback());
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let (classifier, _) = classifier(SplitLlm::new(
            Some("```json\n{\"valence\": 0.5, \"arousal\": 0.3, \"emotions\": [\"gratitude\"], \"confidence\": 0.9}\n```"),
            Some(RISK_OK),
        ));
        let emotion = classifier.analyze_emotion("ありがとうございます", None).await;
        assert_eq!(emotion.emotions, vec![Emotion::Gratitude]);
    }

    #[test]
    fn user_prompt_includes_trimmed_context() {
        let prompt = build_user_prompt("了解です", Some("  店長: 明日は早番です  "));
        assert!(prompt.starts_with("Conversation so far:\n店長: 明日は早番です"));
        assert!(prompt.ends_with("Message:\n了解です"));

        let bare = build_user_prompt("了解です", Some("   "));
        assert_eq!(bare, "Message:\n了解です");
    }

    #[test]
    fn user_prompt_keeps_most_recent_context() {
        let context = format!("{}END", "あ".repeat(CONTEXT_CHARS));
        let prompt = build_user_prompt("x", Some(&context));
        assert!(prompt.contains("END"));
        assert_eq!(prompt.matches('あ').count(), CONTEXT_CHARS - 3);
    }

    #[test]
    fn prompts_name_their_frames() {
        assert!(EMOTION_SYSTEM_PROMPT.contains("Circumplex"));
        assert!(RISK_SYSTEM_PROMPT.contains("psychological safety"));
        assert!(!RISK_SYSTEM_PROMPT.contains("Circumplex"));
    }
}
