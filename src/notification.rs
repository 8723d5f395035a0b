//! Transient notices after each correction attempt
//!
//! Notices are delivered through the platform notification service:
//! - Linux: notify-send, closed early through the freedesktop
//!   notification bus (gdbus)
//! - macOS: osascript (AppleScript)
//!
//! [`Toaster`] keeps at most one notice visible: showing a new one closes
//! the previous immediately, and each notice is closed after its ttl.

use crate::process::run_tool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Longest notice text, in characters
pub const MAX_NOTICE_CHARS: usize = 100;

/// Upper bound for a notification helper invocation
const HELPER_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A sanitized, bounded notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastNotice {
    message: String,
    pub kind: NoticeKind,
    pub ttl: Duration,
}

impl ToastNotice {
    pub fn new(message: &str, kind: NoticeKind, ttl: Duration) -> Self {
        Self {
            message: sanitize_message(message),
            kind,
            ttl,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Strip markup-significant and control characters and cap the length
pub fn sanitize_message(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '&') && !c.is_control())
        .take(MAX_NOTICE_CHARS)
        .collect();
    cleaned.trim().to_string()
}

/// Presentation surface for notices
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Show a notice; returns an id if it can be closed early
    async fn show(&self, notice: &ToastNotice) -> Option<u32>;

    /// Close a notice shown earlier
    async fn dismiss(&self, id: u32);
}

/// Notices through the desktop notification service
pub struct DesktopNotifier;

#[async_trait::async_trait]
impl Notifier for DesktopNotifier {
    #[cfg(target_os = "linux")]
    async fn show(&self, notice: &ToastNotice) -> Option<u32> {
        let expire = format!("--expire-time={}", notice.ttl.as_millis());
        let urgency = match notice.kind {
            NoticeKind::Success => "--urgency=low",
            NoticeKind::Error => "--urgency=normal",
        };
        let args = [
            "--app-name=Textfix",
            "--print-id",
            urgency,
            expire.as_str(),
            "Textfix",
            notice.message(),
        ];

        match run_tool("notify-send", &args, None, HELPER_TIMEOUT).await {
            Ok(output) if output.success => output.stdout.trim().parse().ok(),
            Ok(output) => {
                tracing::debug!("notify-send failed: {}", output.stderr);
                None
            }
            Err(e) => {
                tracing::debug!("Failed to send notification: {:?}", e);
                None
            }
        }
    }

    #[cfg(target_os = "macos")]
    async fn show(&self, notice: &ToastNotice) -> Option<u32> {
        let escaped = notice.message().replace('\\', "\\\\").replace('"', "\\\"");
        let script = format!(r#"display notification "{}" with title "Textfix""#, escaped);

        if let Err(e) = run_tool("osascript", &["-e", &script], None, HELPER_TIMEOUT).await {
            tracing::debug!("Failed to send notification: {:?}", e);
        }
        // macOS notifications cannot be withdrawn from AppleScript
        None
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    async fn show(&self, notice: &ToastNotice) -> Option<u32> {
        tracing::info!("{:?}: {}", notice.kind, notice.message());
        None
    }

    #[cfg(target_os = "linux")]
    async fn dismiss(&self, id: u32) {
        let id = id.to_string();
        let args = [
            "call",
            "--session",
            "--dest",
            "org.freedesktop.Notifications",
            "--object-path",
            "/org/freedesktop/Notifications",
            "--method",
            "org.freedesktop.Notifications.CloseNotification",
            id.as_str(),
        ];

        if let Err(e) = run_tool("gdbus", &args, None, HELPER_TIMEOUT).await {
            tracing::debug!("Failed to close notification {}: {:?}", id, e);
        }
    }

    #[cfg(not(target_os = "linux"))]
    async fn dismiss(&self, _id: u32) {}
}

/// The notice currently on screen
struct Visible {
    seq: u64,
    id: Option<u32>,
    expiry: JoinHandle<()>,
}

/// Shows one notice at a time
pub struct Toaster {
    notifier: Arc<dyn Notifier>,
    enabled: bool,
    ttl: Duration,
    current: Arc<Mutex<Option<Visible>>>,
    seq: AtomicU64,
}

impl Toaster {
    pub fn new(notifier: Arc<dyn Notifier>, enabled: bool, ttl: Duration) -> Self {
        Self {
            notifier,
            enabled,
            ttl,
            current: Arc::new(Mutex::new(None)),
            seq: AtomicU64::new(0),
        }
    }

    /// Replace any visible notice with a new one
    pub async fn notify(&self, kind: NoticeKind, message: &str) {
        let notice = ToastNotice::new(message, kind, self.ttl);
        if !self.enabled {
            tracing::debug!("Notice suppressed: {}", notice.message());
            return;
        }

        let mut current = self.current.lock().await;

        if let Some(previous) = current.take() {
            previous.expiry.abort();
            if let Some(id) = previous.id {
                self.notifier.dismiss(id).await;
            }
        }

        let id = self.notifier.show(&notice).await;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        let expiry = {
            let current = self.current.clone();
            let notifier = self.notifier.clone();
            let ttl = self.ttl;
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                let mut current = current.lock().await;
                // A newer notice owns the slot now
                if current.as_ref().is_some_and(|visible| visible.seq == seq) {
                    if let Some(id) = current.take().and_then(|visible| visible.id) {
                        notifier.dismiss(id).await;
                    }
                }
            })
        };

        *current = Some(Visible { seq, id, expiry });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex as StdMutex;

    /// Tracks which notices are on screen
    #[derive(Default)]
    struct ScreenNotifier {
        next_id: StdMutex<u32>,
        on_screen: StdMutex<BTreeSet<u32>>,
        max_on_screen: StdMutex<usize>,
        shown: StdMutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Notifier for ScreenNotifier {
        async fn show(&self, notice: &ToastNotice) -> Option<u32> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let mut on_screen = self.on_screen.lock().unwrap();
            on_screen.insert(*next);
            let mut max = self.max_on_screen.lock().unwrap();
            *max = (*max).max(on_screen.len());
            self.shown.lock().unwrap().push(notice.message().to_string());
            Some(*next)
        }

        async fn dismiss(&self, id: u32) {
            self.on_screen.lock().unwrap().remove(&id);
        }
    }

    #[test]
    fn test_sanitize_strips_markup_and_controls() {
        assert_eq!(sanitize_message("<b>Done</b> & dusted\n"), "bDone/b  dusted");
        assert_eq!(sanitize_message("tab\there"), "tabhere");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "é".repeat(150);
        assert_eq!(sanitize_message(&long).chars().count(), MAX_NOTICE_CHARS);
    }

    #[tokio::test]
    async fn test_new_notice_closes_previous() {
        let screen = Arc::new(ScreenNotifier::default());
        let toaster = Toaster::new(screen.clone(), true, Duration::from_secs(60));

        toaster.notify(NoticeKind::Error, "No text selected").await;
        toaster.notify(NoticeKind::Success, "Text corrected").await;
        toaster.notify(NoticeKind::Error, "Server returned 500").await;

        assert_eq!(*screen.max_on_screen.lock().unwrap(), 1);
        assert_eq!(screen.on_screen.lock().unwrap().len(), 1);
        assert_eq!(screen.shown.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_notice_expires_after_ttl() {
        let screen = Arc::new(ScreenNotifier::default());
        let toaster = Toaster::new(screen.clone(), true, Duration::from_millis(20));

        toaster.notify(NoticeKind::Success, "Text corrected").await;
        assert_eq!(screen.on_screen.lock().unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(screen.on_screen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_toaster_shows_nothing() {
        let screen = Arc::new(ScreenNotifier::default());
        let toaster = Toaster::new(screen.clone(), false, Duration::from_secs(2));

        toaster.notify(NoticeKind::Error, "No text selected").await;
        assert!(screen.shown.lock().unwrap().is_empty());
    }
}
