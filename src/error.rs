//! Error types for textfix
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the textfix application
#[derive(Error, Debug)]
pub enum TextfixError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Input simulation error: {0}")]
    Input(#[from] InputError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Correction error: {0}")]
    Correction(#[from] CorrectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TextfixError {
    /// Message suitable for a toast notice.
    ///
    /// Remote failures are surfaced as reported by the server; contract
    /// violations never leak response details.
    pub fn user_message(&self) -> String {
        match self {
            TextfixError::Correction(CorrectionError::InvalidResponse(_)) => {
                "Invalid response from server".to_string()
            }
            TextfixError::Correction(e) => e.to_string(),
            TextfixError::Input(e) => e.to_string(),
            TextfixError::Clipboard(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

/// A shortcut string could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutParseError {
    #[error("Shortcut is empty")]
    Empty,

    #[error("Shortcut is too long ({0} characters, max 50)")]
    TooLong(usize),

    #[error("Shortcut '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("Shortcut '{0}' has no key besides modifiers. Example: CTRL+SHIFT+/")]
    MissingKey(String),

    #[error("Unknown key name: '{0}'. Try letters, digits, F1-F24, or symbols like / , . ;")]
    UnknownKey(String),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Invalid shortcut: {0}")]
    InvalidShortcut(#[from] ShortcutParseError),

    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Global key listener failed: {0}")]
    Listen(String),

    #[error("No shortcut action registered")]
    NotRegistered,

    #[error("Hotkey service was destroyed")]
    Destroyed,
}

/// Synthetic copy/paste chords could not be delivered
#[derive(Error, Debug)]
pub enum InputError {
    #[error("{0} not found in PATH. Install it via your package manager.")]
    ToolNotFound(&'static str),

    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool\n  Enable at boot: systemctl --user enable ydotool")]
    YdotoolNotRunning,

    #[error("Accessibility permission required. Grant access in System Settings > Privacy & Security > Accessibility")]
    PermissionDenied,

    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: &'static str, timeout_ms: u64 },

    #[error("{tool} failed: {message}")]
    Failed { tool: &'static str, message: String },
}

/// The system clipboard could not be read or written
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("{0} not found in PATH. Install it via your package manager.")]
    ToolNotFound(&'static str),

    #[error("Clipboard read failed: {0}")]
    ReadFailed(String),

    #[error("Clipboard write failed: {0}")]
    WriteFailed(String),

    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: &'static str, timeout_ms: u64 },
}

/// Errors from the remote correction service
#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No response from server. Please check your connection. ({0})")]
    Network(String),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Too many requests. Please wait a moment.")]
    RateLimited,

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

/// Result type alias using TextfixError
pub type Result<T> = std::result::Result<T, TextfixError>;
