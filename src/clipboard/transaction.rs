//! Capture and inject through the clipboard
//!
//! Both operations borrow the user's clipboard: the current text is
//! snapshotted first and put back on every exit path. Success, an error
//! anywhere in between, or the future being dropped mid-flight all end with
//! the snapshot restored.

use super::{ClipboardBackend, ClipboardSnapshot};
use crate::config::TimingConfig;
use crate::error::{ClipboardError, TextfixError};
use crate::input::InputSimulator;
use std::sync::Arc;

/// Clipboard-mediated selection capture and text injection
pub struct ClipboardTransaction {
    clipboard: Arc<dyn ClipboardBackend>,
    input: Arc<dyn InputSimulator>,
    timing: TimingConfig,
}

impl ClipboardTransaction {
    pub fn new(
        clipboard: Arc<dyn ClipboardBackend>,
        input: Arc<dyn InputSimulator>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            clipboard,
            input,
            timing,
        }
    }

    /// Copy the focused application's selection and return it
    ///
    /// An empty clipboard after the settle wait means nothing was selected
    /// and yields an empty string.
    pub async fn capture_selection(&self) -> Result<String, TextfixError> {
        // Shortcut modifiers still held would merge into the copy chord
        tokio::time::sleep(self.timing.release_wait()).await;

        let guard = RestoreGuard::take(self.clipboard.clone()).await?;
        let result = self.copy_selection().await;
        let text = finish(guard, result).await?;
        tracing::debug!("Captured selection ({} chars)", text.chars().count());
        Ok(text)
    }

    async fn copy_selection(&self) -> Result<String, TextfixError> {
        // Clear first so a failed copy cannot return stale clipboard text
        self.clipboard.clear().await?;
        self.input.simulate_copy().await?;
        tokio::time::sleep(self.timing.capture_settle()).await;
        Ok(self.clipboard.read_text().await?)
    }

    /// Paste `text` over the focused application's selection
    pub async fn inject(&self, text: &str) -> Result<(), TextfixError> {
        let guard = RestoreGuard::take(self.clipboard.clone()).await?;
        let result = self.paste_text(text).await;
        finish(guard, result).await?;
        tracing::debug!("Injected {} chars", text.chars().count());
        Ok(())
    }

    async fn paste_text(&self, text: &str) -> Result<(), TextfixError> {
        self.clipboard.write_text(text).await?;
        tokio::time::sleep(self.timing.paste_settle()).await;
        self.input.simulate_paste().await?;
        // The target reads the clipboard asynchronously after the chord
        tokio::time::sleep(self.timing.paste_complete()).await;
        Ok(())
    }
}

/// Restore the guard's snapshot and merge the outcome with `result`
///
/// The primary failure wins; a restore failure behind it is only logged.
async fn finish<T>(guard: RestoreGuard, result: Result<T, TextfixError>) -> Result<T, TextfixError> {
    let restored = guard.restore().await;
    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore_err)) => {
            tracing::warn!("Clipboard restore also failed: {}", restore_err);
            Err(e)
        }
    }
}

/// Owns a snapshot until it is put back
///
/// `restore` is the normal path. If the guard is dropped with the snapshot
/// still held (the transaction future was cancelled), the restore is
/// spawned on the current runtime.
struct RestoreGuard {
    clipboard: Arc<dyn ClipboardBackend>,
    snapshot: Option<ClipboardSnapshot>,
}

impl RestoreGuard {
    async fn take(clipboard: Arc<dyn ClipboardBackend>) -> Result<Self, ClipboardError> {
        let snapshot = ClipboardSnapshot::take(clipboard.as_ref()).await?;
        Ok(Self {
            clipboard,
            snapshot: Some(snapshot),
        })
    }

    async fn restore(mut self) -> Result<(), ClipboardError> {
        match self.snapshot.take() {
            Some(snapshot) => snapshot.restore(self.clipboard.as_ref()).await,
            None => Ok(()),
        }
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Clipboard transaction interrupted, restoring in background");
                let clipboard = self.clipboard.clone();
                handle.spawn(async move {
                    if let Err(e) = snapshot.restore(clipboard.as_ref()).await {
                        tracing::warn!("Failed to restore clipboard: {}", e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!("Clipboard transaction interrupted outside a runtime, clipboard not restored");
            }
        }
    }
}
