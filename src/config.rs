//! Configuration loading and types for textfix
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/textfix/config.toml)
//! 3. Environment variables (TEXTFIX_*)
//! 4. CLI arguments (highest priority)

use crate::correction::Language;
use crate::error::TextfixError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Textfix Configuration
#
# Location: ~/.config/textfix/config.toml
# All settings can be overridden via CLI flags

# State file for external integrations (Waybar, polybar, etc.)
# Use "auto" for default location ($XDG_RUNTIME_DIR/textfix/state),
# a custom path, or "disabled" to turn off. The daemon writes the pipeline
# stage ("idle", "capturing", "correcting", "injecting") whenever it changes.
state_file = "auto"

[hotkey]
# Global shortcut that corrects the current selection
# Modifiers: CTRL, ALT, SHIFT, META (alias CMD, SUPER)
# Keys: letters, digits, F1-F24, or symbols like / , . ; [ ]
# On macOS, CTRL is mapped to CMD.
shortcut = "CTRL+SHIFT+/"

# Enable built-in hotkey detection (default: true)
# Set to false when using compositor keybindings instead
# When disabled, bind `textfix correct` in your compositor
# enabled = true

# Key event source: "auto", "evdev" (Linux, needs the 'input' group) or "rdev"
# source = "auto"

[service]
# Base URL of the correction service
endpoint = "http://localhost:3333"

# Bearer token (or set TEXTFIX_API_TOKEN)
# api_token = "..."

# Request timeout in seconds
timeout_secs = 30

# Client-side request budget per rolling minute
max_requests_per_minute = 60

[correction]
# Default language: "pt", "en" or "es"
language = "pt"

# Longest selection sent for correction, in characters
max_chars = 10000

[input]
# Copy/paste simulation: "auto", "xdotool", "ydotool", "osascript", "powershell"
backend = "auto"

[clipboard]
# Clipboard access: "auto", "wl-clipboard", "xclip", "pbcopy", "powershell"
backend = "auto"

[timing]
# Wait for the hotkey's modifiers to be let go before the first chord
release_wait_ms = 150

# Wait after simulated copy before reading the clipboard
capture_settle_ms = 100

# Wait after writing the clipboard before simulated paste
paste_settle_ms = 50

# Wait after simulated paste before restoring the clipboard
paste_complete_ms = 100

# Upper bound for each external tool invocation
command_timeout_ms = 2000

[notification]
# Show a short notice after each correction attempt
enabled = true

# How long a notice stays visible
ttl_ms = 2000
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hotkey: HotkeyConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub correction: CorrectionConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub notification: NotificationConfig,

    /// Optional path to state file for external integrations (e.g., Waybar)
    /// Example: "/run/user/1000/textfix/state" or use "auto" for default location
    #[serde(default = "default_state_file")]
    pub state_file: Option<String>,
}

/// Where raw key events come from
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeySourceKind {
    /// evdev on Linux, rdev elsewhere
    #[default]
    Auto,
    /// Kernel-level input devices (Linux only)
    Evdev,
    /// rdev global listener (macOS, Windows, X11)
    Rdev,
}

/// Hotkey detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Shortcut string, e.g. "CTRL+SHIFT+/"
    #[serde(default = "default_shortcut")]
    pub shortcut: String,

    /// Enable built-in hotkey detection (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub source: KeySourceKind,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            shortcut: default_shortcut(),
            enabled: true,
            source: KeySourceKind::Auto,
        }
    }
}

/// Remote correction service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL, e.g. "https://api.example.com"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token; TEXTFIX_API_TOKEN is used when unset
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
            max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

/// Correction request settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorrectionConfig {
    /// Fallback when a run has no valid language hint
    #[serde(default)]
    pub language: Language,

    /// Longest accepted selection, in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            max_chars: default_max_chars(),
        }
    }
}

/// Copy/paste chord strategy
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputBackend {
    /// Pick by platform at startup
    #[default]
    Auto,
    /// X11 (xdotool key)
    Xdotool,
    /// Wayland/TTY via uinput (requires ydotoold)
    Ydotool,
    /// macOS System Events
    Osascript,
    /// Windows WScript.Shell SendKeys
    Powershell,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub backend: InputBackend,
}

/// Clipboard access strategy
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClipboardProvider {
    #[default]
    Auto,
    /// wl-copy / wl-paste
    WlClipboard,
    /// xclip -selection clipboard
    Xclip,
    /// pbcopy / pbpaste
    Pbcopy,
    /// Get-Clipboard / Set-Clipboard
    Powershell,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClipboardConfig {
    #[serde(default)]
    pub backend: ClipboardProvider,
}

/// Settle intervals and tool timeouts
///
/// The settle values are empirical; OS clipboard propagation is not
/// observable, so each step waits a fixed time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// The hotkey fires on key-down, so its modifiers are usually still held
    #[serde(default = "default_release_wait_ms")]
    pub release_wait_ms: u64,

    #[serde(default = "default_capture_settle_ms")]
    pub capture_settle_ms: u64,

    #[serde(default = "default_paste_settle_ms")]
    pub paste_settle_ms: u64,

    #[serde(default = "default_paste_complete_ms")]
    pub paste_complete_ms: u64,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl TimingConfig {
    pub fn release_wait(&self) -> Duration {
        Duration::from_millis(self.release_wait_ms)
    }

    pub fn capture_settle(&self) -> Duration {
        Duration::from_millis(self.capture_settle_ms)
    }

    pub fn paste_settle(&self) -> Duration {
        Duration::from_millis(self.paste_settle_ms)
    }

    pub fn paste_complete(&self) -> Duration {
        Duration::from_millis(self.paste_complete_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            release_wait_ms: default_release_wait_ms(),
            capture_settle_ms: default_capture_settle_ms(),
            paste_settle_ms: default_paste_settle_ms(),
            paste_complete_ms: default_paste_complete_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

/// Notice configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: default_ttl_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_state_file() -> Option<String> {
    Some("auto".to_string())
}

fn default_shortcut() -> String {
    "CTRL+SHIFT+/".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:3333".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_requests_per_minute() -> usize {
    60
}

fn default_max_chars() -> usize {
    10_000
}

fn default_release_wait_ms() -> u64 {
    150
}

fn default_capture_settle_ms() -> u64 {
    100
}

fn default_paste_settle_ms() -> u64 {
    50
}

fn default_paste_complete_ms() -> u64 {
    100
}

fn default_command_timeout_ms() -> u64 {
    2000
}

fn default_ttl_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: HotkeyConfig::default(),
            service: ServiceConfig::default(),
            correction: CorrectionConfig::default(),
            input: InputConfig::default(),
            clipboard: ClipboardConfig::default(),
            timing: TimingConfig::default(),
            notification: NotificationConfig::default(),
            state_file: default_state_file(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "textfix")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state, pid, lock)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to the temp dir
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir())
            .join("textfix")
    }

    /// Resolve the state file path from config
    /// Returns None if state_file is not configured or explicitly disabled
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file.as_ref().and_then(|path| {
            match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            }
        })
    }

    /// Copy with secrets blanked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.service.api_token.is_some() {
            config.service.api_token = Some("<redacted>".to_string());
        }
        config
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, TextfixError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| TextfixError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| TextfixError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Override config values from TEXTFIX_* variables
fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(shortcut) = var("TEXTFIX_SHORTCUT") {
        config.hotkey.shortcut = shortcut;
    }
    if let Some(endpoint) = var("TEXTFIX_ENDPOINT") {
        config.service.endpoint = endpoint;
    }
    if let Some(language) = var("TEXTFIX_LANGUAGE") {
        match Language::parse(&language) {
            Some(language) => config.correction.language = language,
            None => tracing::warn!("Ignoring unsupported TEXTFIX_LANGUAGE '{}'", language),
        }
    }
}

/// Write the commented default config if none exists yet
///
/// Returns the path and whether a new file was written.
pub fn init_config_file(path: Option<&Path>) -> Result<(PathBuf, bool), TextfixError> {
    let path = path
        .map(PathBuf::from)
        .or_else(Config::default_path)
        .ok_or_else(|| TextfixError::Config("Cannot determine config directory".to_string()))?;

    if path.exists() {
        return Ok((path, false));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| TextfixError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(&path, DEFAULT_CONFIG)
        .map_err(|e| TextfixError::Config(format!("Failed to write config: {}", e)))?;

    Ok((path, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.hotkey.shortcut, "CTRL+SHIFT+/");
        assert!(config.hotkey.enabled);
        assert_eq!(config.correction.language, Language::Pt);
        assert_eq!(config.correction.max_chars, 10_000);
        assert_eq!(config.timing.release_wait_ms, 150);
        assert_eq!(config.timing.capture_settle_ms, 100);
        assert_eq!(config.timing.paste_settle_ms, 50);
        assert_eq!(config.timing.paste_complete_ms, 100);
        assert_eq!(config.notification.ttl_ms, 2000);
        assert_eq!(config.input.backend, InputBackend::Auto);
    }

    #[test]
    fn test_default_config_text_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::default();
        assert_eq!(config.hotkey.shortcut, defaults.hotkey.shortcut);
        assert_eq!(config.service.endpoint, defaults.service.endpoint);
        assert_eq!(config.timing.command_timeout_ms, 2000);
        assert_eq!(config.timing.release_wait_ms, defaults.timing.release_wait_ms);
        assert_eq!(config.clipboard.backend, ClipboardProvider::Auto);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
            [hotkey]
            shortcut = "ALT+SHIFT+C"
            source = "rdev"

            [service]
            endpoint = "https://api.example.com"
            api_token = "tok"

            [correction]
            language = "es"

            [input]
            backend = "ydotool"

            [clipboard]
            backend = "wl-clipboard"

            [timing]
            capture_settle_ms = 250
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hotkey.shortcut, "ALT+SHIFT+C");
        assert_eq!(config.hotkey.source, KeySourceKind::Rdev);
        assert_eq!(config.service.endpoint, "https://api.example.com");
        assert_eq!(config.correction.language, Language::Es);
        assert_eq!(config.correction.max_chars, 10_000); // default
        assert_eq!(config.input.backend, InputBackend::Ydotool);
        assert_eq!(config.clipboard.backend, ClipboardProvider::WlClipboard);
        assert_eq!(config.timing.capture_settle_ms, 250);
        assert_eq!(config.timing.paste_settle_ms, 50); // default
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.hotkey.shortcut, "CTRL+SHIFT+/");
        assert!(config.notification.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            "TEXTFIX_SHORTCUT" => Some("CTRL+ALT+K".to_string()),
            "TEXTFIX_LANGUAGE" => Some("klingon".to_string()),
            _ => None,
        });
        assert_eq!(config.hotkey.shortcut, "CTRL+ALT+K");
        assert_eq!(config.correction.language, Language::Pt);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[correction]\nlanguage = \"en\"\nmax_chars = 500\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.correction.max_chars, 500);
    }

    #[test]
    fn test_load_config_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timing\ncapture_settle_ms = ").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_init_config_file_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let (written, created) = init_config_file(Some(&path)).unwrap();
        assert!(created);
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        std::fs::write(&path, "# mine\n").unwrap();
        let (_, created) = init_config_file(Some(&path)).unwrap();
        assert!(!created);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");
    }

    #[test]
    fn test_redacted_hides_token() {
        let mut config = Config::default();
        config.service.api_token = Some("secret".to_string());
        assert_eq!(
            config.redacted().service.api_token.as_deref(),
            Some("<redacted>")
        );
    }

    #[test]
    fn test_resolve_state_file() {
        let mut config = Config::default();
        config.state_file = Some("disabled".to_string());
        assert!(config.resolve_state_file().is_none());

        config.state_file = Some("/tmp/x/state".to_string());
        assert_eq!(config.resolve_state_file(), Some(PathBuf::from("/tmp/x/state")));
    }
}
