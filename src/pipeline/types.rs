//! Value types flowing through the coaching pipeline.
//!
//! All of these live for a single `process_message` call. The model-facing
//! types (`EmotionAnalysis`, `RiskAssessment`, `TransformSuggestion`) have a
//! `validate()` that enforces the ranges the downstream stages rely on.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

// ── Urgency ─────────────────────────────────────────────────────────

/// What the urgency detector recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyAction {
    /// Skip the whole pipeline and deliver as-is.
    Bypass,
    /// Run the pipeline but flag the message as priority.
    Expedite,
    Normal,
}

/// Outcome of keyword-based urgency detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyResult {
    pub is_emergency: bool,
    pub is_priority: bool,
    /// Matched terms, emergency terms first, in table order.
    pub matched_keywords: Vec<String>,
    pub recommended_action: UrgencyAction,
}

// ── Blocked topics ──────────────────────────────────────────────────

/// Regulated employment topics the pipeline refuses to mediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicCategory {
    Compensation,
    Termination,
    Leave,
    WorkingHours,
    UnionProtected,
    Harassment,
}

impl TopicCategory {
    /// Short label for logging.
    pub fn label(self) -> &'static str {
        match self {
            Self::Compensation => "compensation",
            Self::Termination => "termination",
            Self::Leave => "leave",
            Self::WorkingHours => "working_hours",
            Self::UnionProtected => "union_protected",
            Self::Harassment => "harassment",
        }
    }
}

/// One category hit inside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedTopic {
    pub category: TopicCategory,
    /// Every non-overlapping match, joined with `", "`.
    pub matched_text: String,
    /// Canned warning shown instead of an AI answer.
    pub message: String,
}

/// Outcome of the legal/topic filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedTopicResult {
    pub is_blocked: bool,
    pub blocked_topics: Vec<BlockedTopic>,
}

/// An external body a blocked topic is referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Referral {
    pub name: &'static str,
    pub url: &'static str,
}

// ── Emotion ─────────────────────────────────────────────────────────

/// Discrete emotion labels placed on the circumplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joy,
    Gratitude,
    Trust,
    Calm,
    Neutral,
    Surprise,
    Confusion,
    Anxiety,
    Sadness,
    Frustration,
    Anger,
    Contempt,
}

/// Emotional read of a message (Russell's circumplex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionAnalysis {
    /// Negative to positive affect, `-1.0..=1.0`.
    pub valence: f64,
    /// Calm to excited, `0.0..=1.0`.
    pub arousal: f64,
    pub emotions: Vec<Emotion>,
    pub confidence: f64,
}

impl EmotionAnalysis {
    /// Used when the model response cannot be trusted.
    pub fn fallback() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.5,
            emotions: vec![Emotion::Neutral],
            confidence: 0.0,
        }
    }

    /// Placeholder for paths that never ran the classifier.
    pub fn not_analyzed() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.0,
            emotions: vec![Emotion::Neutral],
            confidence: 0.0,
        }
    }

    /// Check ranges and drop duplicate labels.
    pub fn validate(mut self) -> Result<Self, SchemaError> {
        check_range("valence", self.valence, -1.0, 1.0)?;
        check_range("arousal", self.arousal, 0.0, 1.0)?;
        check_range("confidence", self.confidence, 0.0, 1.0)?;
        if self.emotions.is_empty() {
            return Err(SchemaError::Empty("emotions"));
        }
        let mut seen = Vec::with_capacity(self.emotions.len());
        self.emotions.retain(|e| {
            if seen.contains(e) {
                false
            } else {
                seen.push(*e);
                true
            }
        });
        Ok(self)
    }
}

// ── Risk ────────────────────────────────────────────────────────────

/// Ordinal risk level. Ordering follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Aggression and psychological-safety assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// `0..=100`.
    pub aggression_score: u8,
    /// `-10.0..=10.0`, negative harms psychological safety.
    pub psych_safety_impact: f64,
    pub risk_level: RiskLevel,
    pub concerns: Vec<String>,
}

impl RiskAssessment {
    /// Cautious default: an unreadable answer is treated as medium risk.
    pub fn fallback() -> Self {
        Self {
            aggression_score: 50,
            psych_safety_impact: 0.0,
            risk_level: RiskLevel::Medium,
            concerns: vec!["Analysis could not be completed".to_string()],
        }
    }

    /// Fixed assessment for paths that skip the classifier.
    pub fn not_analyzed() -> Self {
        Self {
            aggression_score: 0,
            psych_safety_impact: 0.0,
            risk_level: RiskLevel::Low,
            concerns: Vec::new(),
        }
    }

    pub fn validate(self) -> Result<Self, SchemaError> {
        if self.aggression_score > 100 {
            return Err(SchemaError::OutOfRange {
                field: "aggressionScore",
                value: self.aggression_score.to_string(),
            });
        }
        check_range("psychSafetyImpact", self.psych_safety_impact, -10.0, 10.0)?;
        Ok(self)
    }
}

// ── Rewrites ────────────────────────────────────────────────────────

/// Rewrite style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStyle {
    Factual,
    Supportive,
    Request,
    Collaborative,
}

/// Nonviolent-communication breakdown of a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvcBreakdown {
    pub observation: String,
    pub feeling: String,
    pub need: String,
    pub request: String,
}

/// One suggested rewrite of the original message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSuggestion {
    pub style: TransformStyle,
    pub transformed_text: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nvc: Option<NvcBreakdown>,
}

impl TransformSuggestion {
    pub fn validate(mut self) -> Result<Self, SchemaError> {
        let trimmed = self.transformed_text.trim();
        if trimmed.is_empty() {
            return Err(SchemaError::Empty("transformedText"));
        }
        if trimmed.len() != self.transformed_text.len() {
            self.transformed_text = trimmed.to_string();
        }
        Ok(self)
    }
}

// ── Result ──────────────────────────────────────────────────────────

/// The single artifact returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingResult {
    pub original_message: String,
    pub emotion: EmotionAnalysis,
    pub risk: RiskAssessment,
    pub suggestions: Vec<TransformSuggestion>,
    /// One warning string per matched regulated topic.
    pub blocked_topics: Vec<String>,
    pub requires_human_decision: bool,
    pub summary: String,
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), SchemaError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SchemaError::OutOfRange {
            field,
            value: value.to_string(),
        })
    }
}
