//! Clipboard access through command-line helpers

use super::ClipboardBackend;
use crate::error::ClipboardError;
use crate::platform::Platform;
use crate::process::{run_tool, run_writer, tool_exists, ToolFailure};
use std::time::Duration;

/// Helper tool pair backing the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    WlClipboard,
    Xclip,
    Pbcopy,
    Powershell,
}

/// One helper invocation: program plus arguments
struct Invocation {
    program: &'static str,
    args: &'static [&'static str],
}

impl ClipboardTool {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::MacOs => ClipboardTool::Pbcopy,
            Platform::Windows => ClipboardTool::Powershell,
            Platform::Wayland => ClipboardTool::WlClipboard,
            Platform::X11 => ClipboardTool::Xclip,
        }
    }

    fn read(&self) -> Invocation {
        match self {
            ClipboardTool::WlClipboard => Invocation {
                program: "wl-paste",
                // Images and other binary offers must not be read as text
                args: &["--no-newline", "--type", "text"],
            },
            ClipboardTool::Xclip => Invocation {
                program: "xclip",
                args: &["-selection", "clipboard", "-o"],
            },
            ClipboardTool::Pbcopy => Invocation {
                program: "pbpaste",
                args: &[],
            },
            ClipboardTool::Powershell => Invocation {
                program: "powershell",
                args: &["-NoProfile", "-NonInteractive", "-Command", "Get-Clipboard -Raw"],
            },
        }
    }

    fn write(&self) -> Invocation {
        match self {
            ClipboardTool::WlClipboard => Invocation {
                program: "wl-copy",
                args: &[],
            },
            ClipboardTool::Xclip => Invocation {
                program: "xclip",
                args: &["-selection", "clipboard", "-i"],
            },
            ClipboardTool::Pbcopy => Invocation {
                program: "pbcopy",
                args: &[],
            },
            ClipboardTool::Powershell => Invocation {
                program: "powershell",
                args: &[
                    "-NoProfile",
                    "-NonInteractive",
                    "-Command",
                    "Set-Clipboard -Value ([Console]::In.ReadToEnd())",
                ],
            },
        }
    }

    /// Dedicated clear command, where the tool has one
    fn clear(&self) -> Option<Invocation> {
        match self {
            ClipboardTool::WlClipboard => Some(Invocation {
                program: "wl-copy",
                args: &["--clear"],
            }),
            ClipboardTool::Powershell => Some(Invocation {
                program: "powershell",
                args: &["-NoProfile", "-NonInteractive", "-Command", "Set-Clipboard -Value $null"],
            }),
            ClipboardTool::Xclip | ClipboardTool::Pbcopy => None,
        }
    }

    /// Whether a failed read just means the clipboard holds no text
    fn is_empty_clipboard(&self, stderr: &str) -> bool {
        let lower = stderr.to_lowercase();
        match self {
            ClipboardTool::WlClipboard => {
                lower.contains("nothing is copied")
                    || lower.contains("no selection")
                    || lower.contains("no suitable type")
            }
            ClipboardTool::Xclip => lower.contains("target") && lower.contains("not available"),
            ClipboardTool::Pbcopy | ClipboardTool::Powershell => false,
        }
    }

    /// Tool-specific cleanup of the read output
    fn normalize_read(&self, mut stdout: String) -> String {
        // Get-Clipboard -Raw output ends with the console newline
        if *self == ClipboardTool::Powershell {
            if stdout.ends_with("\r\n") {
                stdout.truncate(stdout.len() - 2);
            } else if stdout.ends_with('\n') {
                stdout.pop();
            }
        }
        stdout
    }
}

/// Clipboard backed by external helpers
pub struct CommandClipboard {
    tool: ClipboardTool,
    timeout: Duration,
}

impl CommandClipboard {
    pub fn new(tool: ClipboardTool, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    fn map_failure(&self, program: &'static str, failure: ToolFailure, writing: bool) -> ClipboardError {
        match failure {
            ToolFailure::NotFound => ClipboardError::ToolNotFound(program),
            ToolFailure::TimedOut => ClipboardError::Timeout {
                tool: program,
                timeout_ms: self.timeout.as_millis() as u64,
            },
            ToolFailure::Io(e) if writing => ClipboardError::WriteFailed(format!("{}: {}", program, e)),
            ToolFailure::Io(e) => ClipboardError::ReadFailed(format!("{}: {}", program, e)),
        }
    }

    async fn run_write(&self, invocation: Invocation, text: &str) -> Result<(), ClipboardError> {
        let ok = run_writer(invocation.program, invocation.args, text, self.timeout)
            .await
            .map_err(|f| self.map_failure(invocation.program, f, true))?;

        if !ok {
            return Err(ClipboardError::WriteFailed(format!(
                "{} exited with error",
                invocation.program
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClipboardBackend for CommandClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        let invocation = self.tool.read();
        let output = run_tool(invocation.program, invocation.args, None, self.timeout)
            .await
            .map_err(|f| self.map_failure(invocation.program, f, false))?;

        if !output.success {
            if self.tool.is_empty_clipboard(&output.stderr) {
                return Ok(String::new());
            }
            return Err(ClipboardError::ReadFailed(format!(
                "{}: {}",
                invocation.program,
                if output.stderr.is_empty() {
                    "exited with error"
                } else {
                    output.stderr.as_str()
                }
            )));
        }

        Ok(self.tool.normalize_read(output.stdout))
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if text.is_empty() {
            return self.clear().await;
        }
        self.run_write(self.tool.write(), text).await?;
        tracing::trace!("Clipboard written via {} ({} chars)", self.name(), text.chars().count());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClipboardError> {
        match self.tool.clear() {
            Some(invocation) => self.run_write(invocation, "").await,
            // Writing empty input empties the selection
            None => self.run_write(self.tool.write(), "").await,
        }
    }

    fn is_available(&self) -> bool {
        tool_exists(self.tool.read().program) && tool_exists(self.tool.write().program)
    }

    fn name(&self) -> &'static str {
        match self.tool {
            ClipboardTool::WlClipboard => "wl-clipboard",
            ClipboardTool::Xclip => "xclip",
            ClipboardTool::Pbcopy => "pbcopy",
            ClipboardTool::Powershell => "powershell",
        }
    }
}
