//! Synthetic copy/paste chords
//!
//! The capture and inject steps need the focused application to perform
//! its own copy or paste. Each backend delivers the platform's
//! primary-modifier chord (Ctrl+C / Ctrl+V, or Cmd on macOS) through a
//! helper tool:
//!
//! - xdotool - X11
//! - ydotool - Wayland/TTY via uinput, requires the ydotoold daemon
//! - osascript - macOS System Events, requires Accessibility permission
//! - powershell - Windows WScript.Shell SendKeys

pub mod command;

use crate::config::{InputBackend, InputConfig};
use crate::error::InputError;
use crate::platform::Platform;
use std::sync::Arc;
use std::time::Duration;

/// The two chords the pipeline sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chord {
    Copy,
    Paste,
}

impl Chord {
    /// Letter key combined with the primary modifier
    pub fn letter(&self) -> char {
        match self {
            Chord::Copy => 'c',
            Chord::Paste => 'v',
        }
    }
}

/// Trait for keyboard chord simulation
#[async_trait::async_trait]
pub trait InputSimulator: Send + Sync {
    /// Press and release primary-modifier + letter
    async fn send_chord(&self, chord: Chord) -> Result<(), InputError>;

    /// Ask the focused application to copy its selection
    async fn simulate_copy(&self) -> Result<(), InputError> {
        self.send_chord(Chord::Copy).await
    }

    /// Ask the focused application to paste the clipboard
    async fn simulate_paste(&self) -> Result<(), InputError> {
        self.send_chord(Chord::Paste).await
    }

    /// Check if the backing tool is installed
    fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Pick the chord backend for this platform
pub fn create_simulator(
    config: &InputConfig,
    platform: Platform,
    timeout: Duration,
) -> Arc<dyn InputSimulator> {
    let tool = match config.backend {
        InputBackend::Auto => command::ChordTool::for_platform(platform),
        InputBackend::Xdotool => command::ChordTool::Xdotool,
        InputBackend::Ydotool => command::ChordTool::Ydotool,
        InputBackend::Osascript => command::ChordTool::Osascript,
        InputBackend::Powershell => command::ChordTool::Powershell,
    };

    tracing::debug!("Using {} for copy/paste chords on {}", tool.program(), platform);
    Arc::new(command::CommandSimulator::new(tool, timeout))
}
