//! Remote text correction
//!
//! Request/response types and the service abstraction. The only real
//! implementation is [`remote::RemoteCorrector`]; tests substitute their own.

pub mod remote;

use crate::error::CorrectionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the correction service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
    Es,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Pt, Language::En, Language::Es];

    /// Parse a language code from the allow-list (case-insensitive)
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "pt" => Some(Language::Pt),
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    /// Resolve a hint, falling back when it is missing or not allowed
    pub fn resolve(hint: Option<&str>, fallback: Language) -> Self {
        match hint {
            Some(code) => Self::parse(code).unwrap_or_else(|| {
                tracing::debug!("Unsupported language '{}', using {}", code, fallback);
                fallback
            }),
            None => fallback,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Es => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Text sent for correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionRequest {
    pub text: String,
    pub language: Language,
}

/// Category of a single change reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Grammar,
    Spelling,
    Punctuation,
    Style,
    #[serde(other)]
    Other,
}

/// One discrete edit in the corrected text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TextChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub corrected: String,
    #[serde(default)]
    pub explanation: String,
}

/// Account usage counters returned with each correction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub monthly: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub remaining: u64,
}

/// A validated correction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionResult {
    pub corrected_text: String,
    pub changes: Vec<TextChange>,
    pub usage: Usage,
}

/// Anything that can correct text
#[async_trait::async_trait]
pub trait CorrectionService: Send + Sync {
    /// Correct the request's text. A successful result always carries a
    /// non-empty corrected text.
    async fn correct(&self, request: &CorrectionRequest) -> Result<CorrectionResult, CorrectionError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!(Language::parse("pt"), Some(Language::Pt));
        assert_eq!(Language::parse(" EN "), Some(Language::En));
        assert_eq!(Language::parse("es"), Some(Language::Es));
        assert_eq!(Language::parse("fr"), None);
        assert_eq!(Language::parse(""), None);
    }

    #[test]
    fn test_resolve_falls_back() {
        assert_eq!(Language::resolve(Some("de"), Language::Pt), Language::Pt);
        assert_eq!(Language::resolve(None, Language::En), Language::En);
        assert_eq!(Language::resolve(Some("es"), Language::Pt), Language::Es);
    }

    #[test]
    fn test_request_serializes_language_code() {
        let request = CorrectionRequest {
            text: "Eu vai pra escola".to_string(),
            language: Language::Pt,
        };
        // This is the exact request body the service receives
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"text": "Eu vai pra escola", "language": "pt"})
        );
    }

    #[test]
    fn test_unknown_change_kind() {
        let change: TextChange =
            serde_json::from_str(r#"{"type":"tone","original":"a","corrected":"b"}"#).unwrap();
        assert_eq!(change.kind, ChangeKind::Other);
        assert!(change.explanation.is_empty());
    }
}
