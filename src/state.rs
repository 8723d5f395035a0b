//! Pipeline stages of the textfix daemon
//!
//! Idle → Capturing → Correcting → Injecting → Idle
//!
//! The current stage is written to the state file for status bars.

use std::fmt;

/// Stage of the correction pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Waiting for the hotkey
    #[default]
    Idle,

    /// Copying the selection out of the focused application
    Capturing,

    /// Waiting for the correction service
    Correcting,

    /// Pasting the corrected text back
    Injecting,
}

impl State {
    /// Name written to the state file
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Capturing => "capturing",
            State::Correcting => "correcting",
            State::Injecting => "injecting",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
