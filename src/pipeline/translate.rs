//! Direct message translation.
//!
//! Unlike the classifier, failures here are returned to the caller: a
//! translation that silently came back empty or unchanged would be worse
//! than an error.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Languages the translator targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese,
    English,
    Chinese,
    Vietnamese,
    Portuguese,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::Japanese => "ja",
            Self::English => "en",
            Self::Chinese => "zh",
            Self::Vietnamese => "vi",
            Self::Portuguese => "pt",
        }
    }

    fn english_name(self) -> &'static str {
        match self {
            Self::Japanese => "Japanese",
            Self::English => "English",
            Self::Chinese => "Simplified Chinese",
            Self::Vietnamese => "Vietnamese",
            Self::Portuguese => "Brazilian Portuguese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ja" | "japanese" => Ok(Self::Japanese),
            "en" | "english" => Ok(Self::English),
            "zh" | "chinese" => Ok(Self::Chinese),
            "vi" | "vietnamese" => Ok(Self::Vietnamese),
            "pt" | "portuguese" => Ok(Self::Portuguese),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// Translates messages between the owner's and employees' languages.
pub struct Translator {
    llm: Arc<dyn LlmProvider>,
}

impl Translator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Translate `text` into `target`, keeping workplace register.
    pub async fn translate(&self, text: &str, target: Language) -> Result<String, LlmError> {
        let system_prompt = format!(
            "Translate the user's workplace chat message into {}. Preserve politeness level, \
             names, dates and numbers. Output only the translation, nothing else.",
            target.english_name()
        );

        let request = CompletionRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(text),
        ])
        .with_temperature(0.2);

        let response = self.llm.complete(request).await?;
        let translated = response.content.trim();
        if translated.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: "empty translation".to_string(),
            });
        }

        info!(language = %target, chars = translated.chars().count(), "Translated message");
        Ok(translated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::llm::provider::{CompletionResponse, FinishReason};

    struct EchoLlm {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for EchoLlm {
        fn model_name(&self) -> &str {
            "mock-translate"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            assert!(!request.json_mode);
            match self.reply {
                Some(reply) => Ok(CompletionResponse {
                    content: reply.to_string(),
                    input_tokens: 0,
                    output_tokens: 0,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "timeout".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn translate_trims_output() {
        let translator = Translator::new(Arc::new(EchoLlm {
            reply: Some("  I'll be late tomorrow.\n"),
        }));
        let out = translator
            .translate("明日遅れます", Language::English)
            .await
            .unwrap();
        assert_eq!(out, "I'll be late tomorrow.");
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let translator = Translator::new(Arc::new(EchoLlm { reply: None }));
        let err = translator
            .translate("明日遅れます", Language::English)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn empty_output_is_an_error() {
        let translator = Translator::new(Arc::new(EchoLlm { reply: Some("   ") }));
        let err = translator
            .translate("hello", Language::Japanese)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn language_parsing() {
        assert_eq!("JA".parse::<Language>().unwrap(), Language::Japanese);
        assert_eq!("vietnamese".parse::<Language>().unwrap(), Language::Vietnamese);
        assert!("klingon".parse::<Language>().is_err());
        assert_eq!(Language::Chinese.to_string(), "zh");
    }
}
