//! System clipboard access and clipboard transactions
//!
//! Backends wrap one command-line helper per platform:
//! - wl-clipboard (wl-copy / wl-paste) - Wayland
//! - xclip - X11
//! - pbcopy / pbpaste - macOS
//! - PowerShell Get-Clipboard / Set-Clipboard - Windows
//!
//! [`transaction::ClipboardTransaction`] builds capture and inject on top of
//! a backend and an input simulator, restoring the user's clipboard on every
//! exit path.

pub mod command;
pub mod transaction;

use crate::config::{ClipboardConfig, ClipboardProvider};
use crate::error::ClipboardError;
use crate::platform::Platform;
use std::sync::Arc;
use std::time::Duration;

/// Trait for clipboard implementations
#[async_trait::async_trait]
pub trait ClipboardBackend: Send + Sync {
    /// Read the clipboard as text. An empty clipboard reads as "".
    async fn read_text(&self) -> Result<String, ClipboardError>;

    /// Replace the clipboard with `text`
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Empty the clipboard
    async fn clear(&self) -> Result<(), ClipboardError> {
        self.write_text("").await
    }

    /// Check if the backing tools are installed
    fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Clipboard text taken right before a transaction touches the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    text: String,
}

impl ClipboardSnapshot {
    pub async fn take(clipboard: &dyn ClipboardBackend) -> Result<Self, ClipboardError> {
        let text = clipboard.read_text().await?;
        tracing::trace!("Clipboard snapshot: {} chars", text.chars().count());
        Ok(Self { text })
    }

    /// Put the snapshot back, consuming it
    pub async fn restore(self, clipboard: &dyn ClipboardBackend) -> Result<(), ClipboardError> {
        if self.text.is_empty() {
            clipboard.clear().await
        } else {
            clipboard.write_text(&self.text).await
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Pick the clipboard backend for this platform
pub fn create_clipboard(
    config: &ClipboardConfig,
    platform: Platform,
    timeout: Duration,
) -> Arc<dyn ClipboardBackend> {
    let tool = match config.backend {
        ClipboardProvider::Auto => command::ClipboardTool::for_platform(platform),
        ClipboardProvider::WlClipboard => command::ClipboardTool::WlClipboard,
        ClipboardProvider::Xclip => command::ClipboardTool::Xclip,
        ClipboardProvider::Pbcopy => command::ClipboardTool::Pbcopy,
        ClipboardProvider::Powershell => command::ClipboardTool::Powershell,
    };

    tracing::debug!("Using {:?} clipboard on {}", tool, platform);
    Arc::new(command::CommandClipboard::new(tool, timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryClipboard {
        text: Mutex<String>,
        clears: Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl ClipboardBackend for MemoryClipboard {
        async fn read_text(&self) -> Result<String, ClipboardError> {
            Ok(self.text.lock().unwrap().clone())
        }

        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            *self.text.lock().unwrap() = text.to_string();
            Ok(())
        }

        async fn clear(&self) -> Result<(), ClipboardError> {
            *self.clears.lock().unwrap() += 1;
            self.text.lock().unwrap().clear();
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    #[tokio::test]
    async fn test_snapshot_restores_text() {
        let clipboard = MemoryClipboard::default();
        clipboard.write_text("original").await.unwrap();

        let snapshot = ClipboardSnapshot::take(&clipboard).await.unwrap();
        assert_eq!(snapshot.text(), "original");

        clipboard.write_text("scratch").await.unwrap();
        snapshot.restore(&clipboard).await.unwrap();
        assert_eq!(clipboard.read_text().await.unwrap(), "original");
    }

    #[tokio::test]
    async fn test_empty_snapshot_restores_by_clearing() {
        let clipboard = MemoryClipboard::default();
        let snapshot = ClipboardSnapshot::take(&clipboard).await.unwrap();

        clipboard.write_text("scratch").await.unwrap();
        snapshot.restore(&clipboard).await.unwrap();
        assert_eq!(clipboard.read_text().await.unwrap(), "");
        assert_eq!(*clipboard.clears.lock().unwrap(), 1);
    }

    #[test]
    fn test_factory_picks_platform_tool() {
        let config = ClipboardConfig::default();
        let timeout = Duration::from_secs(1);
        assert_eq!(create_clipboard(&config, Platform::Wayland, timeout).name(), "wl-clipboard");
        assert_eq!(create_clipboard(&config, Platform::X11, timeout).name(), "xclip");
        assert_eq!(create_clipboard(&config, Platform::MacOs, timeout).name(), "pbcopy");
    }
}
