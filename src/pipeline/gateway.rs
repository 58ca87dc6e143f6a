//! Coaching gateway: the single entry point of the pipeline.
//!
//! Evaluation order, each step an exit point except the last:
//! 1. Emergency keywords → deliver untouched, no model call
//! 2. Regulated topic → block and refer, no model call
//! 3. Trivially short message → neutral result, no model call
//! 4. Full analysis → classify, optionally rewrite, summarize
//!
//! No retries happen here and no deadline is imposed; callers own both.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use crate::llm::provider::LlmProvider;
use crate::pipeline::classifier::{ClassifierConfig, EmotionRiskClassifier};
use crate::pipeline::rewriter::{self, RewriteGenerator, RewriterConfig};
use crate::pipeline::topics::TopicFilter;
use crate::pipeline::types::{
    BlockedTopicResult, CoachingResult, EmotionAnalysis, Referral, RiskAssessment, RiskLevel,
};
use crate::pipeline::urgency;

pub const EMERGENCY_SUMMARY: &str =
    "🚨 緊急のメッセージとして判定されたため、AIによる確認を行わずにそのまま送信します。";
pub const TRIVIAL_SUMMARY: &str = "短いメッセージのため、特に問題はありません。";
pub const PRIORITY_PREFIX: &str = "【優先】";
const REFERRAL_HEADER: &str = "相談窓口:";

/// Aggression above this always needs a human, whatever the risk level.
const AGGRESSION_REVIEW_THRESHOLD: u8 = 50;

/// Per-call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Messages shorter than this (in characters) skip analysis.
    pub min_message_length: usize,
    /// Analyze and rewrite regardless of length or risk level.
    pub force_analysis: bool,
    /// Preceding conversation, forwarded to the classifier.
    pub context: Option<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            min_message_length: 10,
            force_analysis: false,
            context: None,
        }
    }
}

/// Which exit the gateway took. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Emergency,
    Blocked,
    Trivial,
    Analyzed,
}

impl Route {
    fn label(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Blocked => "blocked",
            Self::Trivial => "trivial",
            Self::Analyzed => "analyzed",
        }
    }
}

/// Composes the urgency, topic, classifier and rewrite stages.
pub struct CoachingGateway {
    topics: TopicFilter,
    classifier: EmotionRiskClassifier,
    rewriter: RewriteGenerator,
}

impl CoachingGateway {
    /// Build a gateway with default stage configuration.
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::with_config(
            llm,
            TopicFilter::default_rules(),
            ClassifierConfig::default(),
            RewriterConfig::default(),
        )
    }

    /// Build a gateway with explicit stage configuration.
    pub fn with_config(
        llm: Arc<dyn LlmProvider>,
        topics: TopicFilter,
        classifier: ClassifierConfig,
        rewriter: RewriterConfig,
    ) -> Self {
        Self {
            topics,
            classifier: EmotionRiskClassifier::new(Arc::clone(&llm), classifier),
            rewriter: RewriteGenerator::new(llm, rewriter),
        }
    }

    /// Run one message through the pipeline.
    pub async fn process_message(&self, message: &str, options: &ProcessOptions) -> CoachingResult {
        let (route, result) = self.route(message, options).await;
        info!(
            route = route.label(),
            risk_level = result.risk.risk_level.label(),
            suggestions = result.suggestions.len(),
            requires_human = result.requires_human_decision,
            "Processed message"
        );
        result
    }

    /// Process independent messages concurrently. Output order matches input.
    pub async fn process_batch(
        &self,
        messages: Vec<String>,
        options: &ProcessOptions,
    ) -> Vec<CoachingResult> {
        info!(count = messages.len(), "Processing message batch");
        join_all(
            messages
                .iter()
                .map(|message| self.process_message(message, options)),
        )
        .await
    }

    async fn route(&self, message: &str, options: &ProcessOptions) -> (Route, CoachingResult) {
        if urgency::should_bypass(message) {
            return (Route::Emergency, emergency_result(message));
        }

        let blocked = self.topics.check(message);
        if blocked.is_blocked {
            return (Route::Blocked, blocked_result(message, &blocked));
        }

        if message.chars().count() < options.min_message_length && !options.force_analysis {
            return (Route::Trivial, trivial_result(message));
        }

        (Route::Analyzed, self.analyze(message, options).await)
    }

    async fn analyze(&self, message: &str, options: &ProcessOptions) -> CoachingResult {
        let analysis = self
            .classifier
            .analyze(message, options.context.as_deref())
            .await;

        // Emergencies already exited; this only flags priority.
        let flags = urgency::detect_urgency(message);

        let suggestions = if analysis.risk.risk_level != RiskLevel::Low || options.force_analysis {
            self.rewriter
                .generate(message, &analysis.emotion, &analysis.risk)
                .await
        } else {
            debug!("Low risk, skipping rewrite generation");
            Vec::new()
        };

        let requires_human_decision = analysis.risk.risk_level >= RiskLevel::High
            || analysis.risk.aggression_score > AGGRESSION_REVIEW_THRESHOLD;

        let summary = rewriter::quick_summary(&analysis.risk);
        let summary = if flags.is_priority && !flags.is_emergency {
            format!("{PRIORITY_PREFIX}{summary}")
        } else {
            summary.to_string()
        };

        CoachingResult {
            original_message: message.to_string(),
            emotion: analysis.emotion,
            risk: analysis.risk,
            suggestions,
            blocked_topics: Vec::new(),
            requires_human_decision,
            summary,
        }
    }
}

fn emergency_result(message: &str) -> CoachingResult {
    CoachingResult {
        original_message: message.to_string(),
        emotion: EmotionAnalysis::not_analyzed(),
        risk: RiskAssessment::not_analyzed(),
        suggestions: Vec::new(),
        blocked_topics: Vec::new(),
        requires_human_decision: false,
        summary: EMERGENCY_SUMMARY.to_string(),
    }
}

fn trivial_result(message: &str) -> CoachingResult {
    CoachingResult {
        original_message: message.to_string(),
        emotion: EmotionAnalysis {
            confidence: 1.0,
            ..EmotionAnalysis::not_analyzed()
        },
        risk: RiskAssessment::not_analyzed(),
        suggestions: Vec::new(),
        blocked_topics: Vec::new(),
        requires_human_decision: false,
        summary: TRIVIAL_SUMMARY.to_string(),
    }
}

fn blocked_result(message: &str, blocked: &BlockedTopicResult) -> CoachingResult {
    let warnings: Vec<String> = blocked
        .blocked_topics
        .iter()
        .map(|t| t.message.clone())
        .collect();

    CoachingResult {
        original_message: message.to_string(),
        emotion: EmotionAnalysis::not_analyzed(),
        risk: RiskAssessment::not_analyzed(),
        suggestions: Vec::new(),
        summary: blocked_summary(&warnings, blocked),
        blocked_topics: warnings,
        requires_human_decision: true,
    }
}

/// Warnings, one per line, then the distinct referral contacts.
fn blocked_summary(warnings: &[String], blocked: &BlockedTopicResult) -> String {
    let mut referrals: Vec<Referral> = Vec::new();
    for referral in blocked
        .blocked_topics
        .iter()
        .filter_map(|t| t.category.referral())
    {
        if !referrals.contains(&referral) {
            referrals.push(referral);
        }
    }

    let mut summary = warnings.join("\n");
    if !referrals.is_empty() {
        summary.push_str("\n\n");
        summary.push_str(REFERRAL_HEADER);
        for referral in referrals {
            summary.push_str(&format!("\n- {}: {}", referral.name, referral.url));
        }
    }
    summary
}
