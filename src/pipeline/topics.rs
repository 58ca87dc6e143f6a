//! Regulated-topic filter.
//!
//! Messages about pay, dismissal, leave, working hours, union activity or
//! harassment must never be answered or rewritten by the model. The filter
//! flags them so the gateway can hand back canned referrals to official
//! bodies instead.
//!
//! Every rule is evaluated; one message can hit several categories.

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::{BlockedTopic, BlockedTopicResult, Referral, TopicCategory};

const LABOUR_STANDARDS_OFFICE: Referral = Referral {
    name: "労働基準監督署",
    url: "https://www.mhlw.go.jp/kouseiroudoushou/shozaiannai/roudoukyoku/",
};

const LABOUR_CONSULTATION_CORNER: Referral = Referral {
    name: "総合労働相談コーナー",
    url: "https://www.mhlw.go.jp/general/seido/chihou/kaiketu/soudan.html",
};

const HARASSMENT_HELPLINE: Referral = Referral {
    name: "ハラスメント悩み相談室",
    url: "https://harasu-soudan.mhlw.go.jp/",
};

impl TopicCategory {
    /// Official body a blocked topic is referred to, if one is configured.
    pub fn referral(self) -> Option<Referral> {
        match self {
            Self::Compensation | Self::Leave | Self::WorkingHours => Some(LABOUR_STANDARDS_OFFICE),
            Self::Termination => Some(LABOUR_CONSULTATION_CORNER),
            Self::Harassment => Some(HARASSMENT_HELPLINE),
            // Union matters go to the union itself; no public referral.
            Self::UnionProtected => None,
        }
    }
}

/// A single topic rule with a compiled regex.
#[derive(Debug, Clone)]
pub struct TopicRule {
    /// Compiled regex for matching.
    pub regex: Regex,
    pub category: TopicCategory,
    /// Canned warning returned to the sender.
    pub message: String,
}

/// Ordered table of regulated-topic rules.
#[derive(Debug, Clone)]
pub struct TopicFilter {
    rules: Vec<TopicRule>,
}

impl TopicFilter {
    /// Create a filter with the six built-in categories.
    pub fn default_rules() -> Self {
        let rules = vec![
            TopicRule {
                regex: Regex::new(
                    r"(?i)給与|給料|賃金|残業代|ボーナス|賞与|昇給|減給|時給|月給|\b(?:salary|wages?|bonus|pay\s*raise)\b",
                )
                .unwrap(),
                category: TopicCategory::Compensation,
                message: "給与・賃金に関するご相談はAIによる仲介の対象外です。労働条件については公的な相談窓口をご利用ください。".into(),
            },
            TopicRule {
                regex: Regex::new(
                    r"(?i)退職|解雇|クビ|辞め(?:たい|ます|る|させ)|辞職|雇い止め|\b(?:fired|resign(?:ation)?|lay\s*off|dismiss(?:al|ed)?)\b",
                )
                .unwrap(),
                category: TopicCategory::Termination,
                message: "退職・解雇に関するご相談はAIによる仲介の対象外です。雇用契約の終了については専門の相談窓口をご利用ください。".into(),
            },
            TopicRule {
                regex: Regex::new(
                    r"(?i)有給|有休|休暇|育休|産休|育児休業|介護休業|\b(?:paid\s+leave|maternity|paternity|sick\s+leave)\b",
                )
                .unwrap(),
                category: TopicCategory::Leave,
                message: "休暇・休業に関するご相談はAIによる仲介の対象外です。取得条件については公的な相談窓口をご確認ください。".into(),
            },
            TopicRule {
                regex: Regex::new(
                    r"(?i)労働時間|サービス残業|残業|休憩時間|36協定|三六協定|休日出勤|深夜勤務|\b(?:overtime|working\s+hours)\b",
                )
                .unwrap(),
                category: TopicCategory::WorkingHours,
                message: "労働時間・残業に関するご相談はAIによる仲介の対象外です。法定の基準については公的な相談窓口をご利用ください。".into(),
            },
            TopicRule {
                regex: Regex::new(
                    r"(?i)労働組合|労組|組合活動|団体交渉|団交|ストライキ|\b(?:labou?r\s+union|union|strike|collective\s+bargaining)\b",
                )
                .unwrap(),
                category: TopicCategory::UnionProtected,
                message: "労働組合・団体交渉に関する内容は法律で保護された活動のため、AIによる仲介の対象外です。".into(),
            },
            TopicRule {
                regex: Regex::new(
                    r"(?i)パワハラ|セクハラ|モラハラ|マタハラ|ハラスメント|いじめ|嫌がらせ|\b(?:harass(?:ment|ed|ing)?|bullying)\b",
                )
                .unwrap(),
                category: TopicCategory::Harassment,
                message: "ハラスメントに関するご相談はAIによる仲介の対象外です。専門の相談窓口へご連絡ください。".into(),
            },
        ];

        Self { rules }
    }

    /// Create an empty filter (for testing).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a custom rule after the built-in ones.
    pub fn add_rule(
        &mut self,
        pattern: &str,
        category: TopicCategory,
        message: &str,
    ) -> Result<(), regex::Error> {
        self.rules.push(TopicRule {
            regex: Regex::new(pattern)?,
            category,
            message: message.into(),
        });
        Ok(())
    }

    /// Check a message against every rule.
    pub fn check(&self, message: &str) -> BlockedTopicResult {
        let mut blocked_topics = Vec::new();

        for rule in &self.rules {
            let matches: Vec<&str> = rule.regex.find_iter(message).map(|m| m.as_str()).collect();
            if matches.is_empty() {
                continue;
            }

            debug!(
                category = rule.category.label(),
                matches = matches.len(),
                "Message matched blocked topic"
            );
            blocked_topics.push(BlockedTopic {
                category: rule.category,
                matched_text: matches.join(", "),
                message: rule.message.clone(),
            });
        }

        BlockedTopicResult {
            is_blocked: !blocked_topics.is_empty(),
            blocked_topics,
        }
    }
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self::default_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(result: &BlockedTopicResult) -> Vec<TopicCategory> {
        result.blocked_topics.iter().map(|t| t.category).collect()
    }

    #[test]
    fn pay_and_resignation_hit_two_categories() {
        let filter = TopicFilter::default_rules();
        let result = filter.check("給与を上げてくれないなら退職したいです。");
        assert!(result.is_blocked);
        assert_eq!(
            categories(&result),
            vec![TopicCategory::Compensation, TopicCategory::Termination]
        );
        assert_eq!(result.blocked_topics[0].matched_text, "給与");
        assert_eq!(result.blocked_topics[1].matched_text, "退職");
    }

    #[test]
    fn collects_every_match_in_a_category() {
        let filter = TopicFilter::default_rules();
        let result = filter.check("給料と賞与の話です");
        assert_eq!(categories(&result), vec![TopicCategory::Compensation]);
        assert_eq!(result.blocked_topics[0].matched_text, "給料, 賞与");
    }

    #[test]
    fn english_terms_respect_word_boundaries() {
        let filter = TopicFilter::default_rules();
        assert!(filter.check("I was harassed by a coworker").is_blocked);
        assert!(filter.check("Please reunionize the files").blocked_topics.is_empty());
    }

    #[test]
    fn harassment_and_union_detected() {
        let filter = TopicFilter::default_rules();
        let result = filter.check("パワハラについて労働組合に相談したい");
        assert_eq!(
            categories(&result),
            vec![TopicCategory::UnionProtected, TopicCategory::Harassment]
        );
    }

    #[test]
    fn ordinary_message_passes() {
        let filter = TopicFilter::default_rules();
        let result = filter.check("なんで何度言ってもできないんだ！やる気がないなら帰れ！");
        assert!(!result.is_blocked);
        assert!(result.blocked_topics.is_empty());
    }

    #[test]
    fn referral_lookup() {
        assert_eq!(
            TopicCategory::Harassment.referral().map(|r| r.name),
            Some("ハラスメント悩み相談室")
        );
        assert_eq!(
            TopicCategory::Compensation.referral(),
            TopicCategory::WorkingHours.referral()
        );
        assert!(TopicCategory::UnionProtected.referral().is_none());
    }

    #[test]
    fn custom_rule_appended() {
        let mut filter = TopicFilter::empty();
        assert!(!filter.check("年俸の交渉").is_blocked);
        filter
            .add_rule("年俸", TopicCategory::Compensation, "custom")
            .unwrap();
        let result = filter.check("年俸の交渉");
        assert!(result.is_blocked);
        assert_eq!(result.blocked_topics[0].message, "custom");
    }

    #[test]
    fn invalid_custom_pattern_is_rejected() {
        let mut filter = TopicFilter::empty();
        assert!(filter.add_rule("(", TopicCategory::Leave, "x").is_err());
    }
}
