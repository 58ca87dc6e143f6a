//! Keyword urgency detection.
//!
//! Plain case-insensitive substring containment against two fixed term
//! lists. No tokenization: a term inside a longer word still matches, so
//! false positives are possible and accepted.

use tracing::debug;

use crate::pipeline::types::{UrgencyAction, UrgencyResult};

/// Terms that skip the pipeline entirely. Includes clinic vocabulary.
/// Stored lowercase.
pub const EMERGENCY_TERMS: &[&str] = &[
    "至急",
    "緊急",
    "救急",
    "119番",
    "出血",
    "意識がない",
    "意識不明",
    "倒れた",
    "倒れて",
    "呼吸",
    "心肺停止",
    "けいれん",
    "痙攣",
    "アナフィラキシー",
    "ショック状態",
    "火事",
    "火災",
    "事故",
    "emergency",
    "ambulance",
    "bleeding",
    "unconscious",
];

/// Terms that flag a message as priority without skipping analysis.
pub const PRIORITY_TERMS: &[&str] = &[
    "急ぎ",
    "早めに",
    "なるべく早く",
    "今日中",
    "本日中",
    "重要",
    "優先",
    "締め切り",
    "締切",
    "urgent",
    "asap",
    "priority",
    "deadline",
];

fn matches<'a>(haystack: &str, terms: &[&'a str]) -> Vec<&'a str> {
    terms
        .iter()
        .copied()
        .filter(|term| haystack.contains(term))
        .collect()
}

/// Classify a message as emergency, priority, or normal.
pub fn detect_urgency(message: &str) -> UrgencyResult {
    let lowered = message.to_lowercase();
    let emergency = matches(&lowered, EMERGENCY_TERMS);
    let priority = matches(&lowered, PRIORITY_TERMS);

    let is_emergency = !emergency.is_empty();
    let is_priority = !priority.is_empty();

    let recommended_action = if is_emergency {
        UrgencyAction::Bypass
    } else if is_priority {
        UrgencyAction::Expedite
    } else {
        UrgencyAction::Normal
    };

    let matched_keywords: Vec<String> = emergency
        .into_iter()
        .chain(priority)
        .map(String::from)
        .collect();

    if !matched_keywords.is_empty() {
        debug!(
            keywords = ?matched_keywords,
            action = ?recommended_action,
            "Urgency keywords matched"
        );
    }

    UrgencyResult {
        is_emergency,
        is_priority,
        matched_keywords,
        recommended_action,
    }
}

/// Whether the message should skip all mediation.
pub fn should_bypass(message: &str) -> bool {
    detect_urgency(message).is_emergency
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_term_bypasses() {
        let result = detect_urgency("患者さんが出血しています、至急来てください");
        assert!(result.is_emergency);
        assert_eq!(result.recommended_action, UrgencyAction::Bypass);
        assert_eq!(result.matched_keywords, vec!["至急", "出血"]);
        assert!(should_bypass("至急お願いします"));
    }

    #[test]
    fn priority_term_expedites() {
        let result = detect_urgency("今日中に資料の確認をお願いできますか");
        assert!(!result.is_emergency);
        assert!(result.is_priority);
        assert_eq!(result.recommended_action, UrgencyAction::Expedite);
        assert!(!should_bypass("今日中に資料の確認をお願いできますか"));
    }

    #[test]
    fn emergency_wins_over_priority() {
        let result = detect_urgency("緊急です、重要な連絡があります");
        assert!(result.is_emergency);
        assert!(result.is_priority);
        assert_eq!(result.recommended_action, UrgencyAction::Bypass);
        assert_eq!(result.matched_keywords, vec!["緊急", "重要"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(should_bypass("EMERGENCY in room 3"));
        let result = detect_urgency("Need this ASAP please");
        assert!(result.is_priority);
        assert_eq!(result.matched_keywords, vec!["asap"]);
    }

    #[test]
    fn substring_inside_longer_word_still_matches() {
        // "priority" inside "prioritycode" is an accepted false positive.
        assert!(detect_urgency("see prioritycode field").is_priority);
    }

    #[test]
    fn plain_message_is_normal() {
        let result = detect_urgency("明日のシフトについて相談させてください");
        assert!(!result.is_emergency);
        assert!(!result.is_priority);
        assert!(result.matched_keywords.is_empty());
        assert_eq!(result.recommended_action, UrgencyAction::Normal);
    }
}
