//! Correction pipeline
//!
//! capture → length check → remote correction → inject → notice
//!
//! Each run reports exactly one notice (nothing for a rejected overlapping
//! run). Clipboard restoration is owned by the transaction layer, so every
//! abort below leaves the user's clipboard as it was.

use crate::clipboard::transaction::ClipboardTransaction;
use crate::config::CorrectionConfig;
use crate::correction::{CorrectionRequest, CorrectionService, Language};
use crate::error::{CorrectionError, TextfixError};
use crate::notification::{NoticeKind, Toaster};
use crate::state::State;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// How a run ended
#[derive(Debug)]
pub enum Outcome {
    /// The selection was replaced
    Corrected { chars: usize, changes: usize },
    /// Nothing (or only whitespace) was selected
    EmptySelection,
    /// The selection exceeds the character limit
    TooLong { len: usize, max: usize },
    /// Another run was in flight; this one did nothing
    Busy,
    Failed(TextfixError),
}

impl Outcome {
    /// Notice reported for this outcome
    pub fn notice(&self) -> Option<(NoticeKind, String)> {
        match self {
            Outcome::Corrected { .. } => Some((NoticeKind::Success, "Text corrected".to_string())),
            Outcome::EmptySelection => Some((NoticeKind::Error, "No text selected".to_string())),
            Outcome::TooLong { max, .. } => Some((
                NoticeKind::Error,
                format!("Text too long (max {} characters)", group_thousands(*max)),
            )),
            Outcome::Busy => None,
            Outcome::Failed(e) => Some((NoticeKind::Error, e.user_message())),
        }
    }
}

/// Sequences one correction per hotkey press
pub struct Orchestrator {
    transaction: ClipboardTransaction,
    service: Arc<dyn CorrectionService>,
    toaster: Toaster,
    default_language: Language,
    max_chars: usize,
    in_flight: Mutex<()>,
    stage: watch::Sender<State>,
}

impl Orchestrator {
    pub fn new(
        transaction: ClipboardTransaction,
        service: Arc<dyn CorrectionService>,
        toaster: Toaster,
        config: &CorrectionConfig,
    ) -> Self {
        let (stage, _) = watch::channel(State::Idle);
        Self {
            transaction,
            service,
            toaster,
            default_language: config.language,
            max_chars: config.max_chars,
            in_flight: Mutex::new(()),
            stage,
        }
    }

    /// Follow the pipeline stage
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.stage.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Correct the current selection in place
    ///
    /// `language_hint` outside the supported set falls back to the
    /// configured default.
    pub async fn run(&self, language_hint: Option<&str>) -> Outcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::info!("Correction already in progress, ignoring trigger");
            return Outcome::Busy;
        };

        let outcome = self.pipeline(language_hint).await;
        self.stage.send_replace(State::Idle);

        match &outcome {
            Outcome::Corrected { chars, changes } => {
                tracing::info!("Corrected {} chars ({} changes)", chars, changes)
            }
            Outcome::Failed(e) => tracing::warn!("Correction failed: {}", e),
            other => tracing::info!("Correction skipped: {:?}", other),
        }

        if let Some((kind, message)) = outcome.notice() {
            self.toaster.notify(kind, &message).await;
        }

        outcome
    }

    async fn pipeline(&self, language_hint: Option<&str>) -> Outcome {
        let language = Language::resolve(language_hint, self.default_language);

        self.stage.send_replace(State::Capturing);
        let text = match self.transaction.capture_selection().await {
            Ok(text) => text,
            Err(e) => return Outcome::Failed(e),
        };

        if text.trim().is_empty() {
            return Outcome::EmptySelection;
        }

        let len = text.chars().count();
        if len > self.max_chars {
            return Outcome::TooLong {
                len,
                max: self.max_chars,
            };
        }

        self.stage.send_replace(State::Correcting);
        tracing::debug!(
            "Requesting correction from {} ({} chars, {})",
            self.service.name(),
            len,
            language
        );
        let request = CorrectionRequest { text, language };
        let result = match self.service.correct(&request).await {
            Ok(result) => result,
            Err(e) => return Outcome::Failed(e.into()),
        };

        if result.corrected_text.is_empty() {
            return Outcome::Failed(
                CorrectionError::InvalidResponse("empty correctedText".to_string()).into(),
            );
        }

        self.stage.send_replace(State::Injecting);
        if let Err(e) = self.transaction.inject(&result.corrected_text).await {
            return Outcome::Failed(e);
        }

        Outcome::Corrected {
            chars: result.corrected_text.chars().count(),
            changes: result.changes.len(),
        }
    }
}

/// 10000 → "10,000"
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
