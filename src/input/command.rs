//! Chord delivery through external helper tools

use super::{Chord, InputSimulator};
use crate::error::InputError;
use crate::platform::Platform;
use crate::process::{run_tool, tool_exists, ToolFailure};
use std::time::Duration;

// Linux input event codes used by ydotool
const KEY_LEFTCTRL: u16 = 29;
const KEY_C: u16 = 46;
const KEY_V: u16 = 47;

/// Helper tool that sends the keystrokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordTool {
    Xdotool,
    Ydotool,
    Osascript,
    Powershell,
}

impl ChordTool {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::MacOs => ChordTool::Osascript,
            Platform::Windows => ChordTool::Powershell,
            Platform::Wayland => ChordTool::Ydotool,
            Platform::X11 => ChordTool::Xdotool,
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            ChordTool::Xdotool => "xdotool",
            ChordTool::Ydotool => "ydotool",
            ChordTool::Osascript => "osascript",
            ChordTool::Powershell => "powershell",
        }
    }

    /// Command-line arguments that press and release the chord
    pub fn args(&self, chord: Chord) -> Vec<String> {
        let letter = chord.letter();
        match self {
            // --clearmodifiers releases the user's still-held hotkey modifiers
            ChordTool::Xdotool => vec![
                "key".to_string(),
                "--clearmodifiers".to_string(),
                format!("ctrl+{}", letter),
            ],
            // Format: key_code:1 (press) then key_code:0 (release)
            ChordTool::Ydotool => {
                let key = match chord {
                    Chord::Copy => KEY_C,
                    Chord::Paste => KEY_V,
                };
                vec![
                    "key".to_string(),
                    format!("{}:1", KEY_LEFTCTRL),
                    format!("{}:1", key),
                    format!("{}:0", key),
                    format!("{}:0", KEY_LEFTCTRL),
                ]
            }
            ChordTool::Osascript => vec![
                "-e".to_string(),
                format!(
                    r#"tell application "System Events" to keystroke "{}" using command down"#,
                    letter
                ),
            ],
            ChordTool::Powershell => vec![
                "-NoProfile".to_string(),
                "-NonInteractive".to_string(),
                "-Command".to_string(),
                format!(
                    "$shell = New-Object -ComObject WScript.Shell; $shell.SendKeys('^{}')",
                    letter
                ),
            ],
        }
    }

    /// Map a failed run's stderr onto a specific error
    fn classify_failure(&self, stderr: &str) -> InputError {
        let lower = stderr.to_lowercase();
        match self {
            ChordTool::Ydotool
                if lower.contains("socket") || lower.contains("connect") || lower.contains("daemon") =>
            {
                InputError::YdotoolNotRunning
            }
            ChordTool::Osascript
                if lower.contains("not allowed")
                    || lower.contains("assistive")
                    || lower.contains("accessibility")
                    || lower.contains("1002") =>
            {
                InputError::PermissionDenied
            }
            _ => InputError::Failed {
                tool: self.program(),
                message: if stderr.is_empty() {
                    "exited with error".to_string()
                } else {
                    stderr.to_string()
                },
            },
        }
    }
}

/// Chord simulator backed by one helper tool
pub struct CommandSimulator {
    tool: ChordTool,
    timeout: Duration,
}

impl CommandSimulator {
    pub fn new(tool: ChordTool, timeout: Duration) -> Self {
        Self { tool, timeout }
    }
}

#[async_trait::async_trait]
impl InputSimulator for CommandSimulator {
    async fn send_chord(&self, chord: Chord) -> Result<(), InputError> {
        let program = self.tool.program();
        let args = self.tool.args(chord);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = run_tool(program, &arg_refs, None, self.timeout)
            .await
            .map_err(|failure| match failure {
                ToolFailure::NotFound => InputError::ToolNotFound(program),
                ToolFailure::TimedOut => InputError::Timeout {
                    tool: program,
                    timeout_ms: self.timeout.as_millis() as u64,
                },
                ToolFailure::Io(e) => InputError::Failed {
                    tool: program,
                    message: e.to_string(),
                },
            })?;

        if !output.success {
            return Err(self.tool.classify_failure(&output.stderr));
        }

        tracing::debug!("Sent {:?} chord via {}", chord, program);
        Ok(())
    }

    fn is_available(&self) -> bool {
        tool_exists(self.tool.program())
    }

    fn name(&self) -> &'static str {
        self.tool.program()
    }
}
