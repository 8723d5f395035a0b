//! Bounded external tool invocation
//!
//! Clipboard and input backends shell out to small helpers (wl-copy,
//! xdotool, osascript, ...). Every invocation goes through here so a hung
//! helper is killed after the configured timeout instead of stalling the
//! pipeline.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured result of a finished helper
#[derive(Debug)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Why a helper did not produce output
#[derive(Debug)]
pub enum ToolFailure {
    /// The binary is not installed
    NotFound,
    /// Spawn or pipe error
    Io(std::io::Error),
    /// Killed after exceeding the timeout
    TimedOut,
}

/// Run `program` with `args`, optionally feeding `stdin`, and wait at most
/// `timeout` for it to exit.
pub async fn run_tool(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<ToolOutput, ToolFailure> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolFailure::NotFound
            } else {
                ToolFailure::Io(e)
            }
        })?;

    let run = async {
        if let (Some(text), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(text.as_bytes()).await?;
            // Close stdin to signal EOF
            drop(pipe);
        }
        child.wait_with_output().await
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) => Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Ok(Err(e)) => Err(ToolFailure::Io(e)),
        // Dropping the future drops the child, which kills it
        Err(_) => {
            tracing::warn!("{} timed out after {}ms", program, timeout.as_millis());
            Err(ToolFailure::TimedOut)
        }
    }
}

/// Run a clipboard writer that may fork to keep serving the selection
///
/// wl-copy and xclip leave a background child holding the output pipes, so
/// only the exit status of the direct child is awaited.
pub async fn run_writer(
    program: &str,
    args: &[&str],
    stdin: &str,
    timeout: Duration,
) -> Result<bool, ToolFailure> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolFailure::NotFound
            } else {
                ToolFailure::Io(e)
            }
        })?;

    let run = async {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(stdin.as_bytes()).await?;
            drop(pipe);
        }
        child.wait().await
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(status)) => Ok(status.success()),
        Ok(Err(e)) => Err(ToolFailure::Io(e)),
        Err(_) => {
            tracing::warn!("{} timed out after {}ms", program, timeout.as_millis());
            Err(ToolFailure::TimedOut)
        }
    }
}

/// Whether `program` resolves on PATH
pub fn tool_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool() {
        let result = run_tool(
            "textfix-definitely-not-installed",
            &[],
            None,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(ToolFailure::NotFound)));
    }

    #[tokio::test]
    async fn test_stdin_round_trip() {
        let output = run_tool("cat", &[], Some("héllo"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "héllo");
    }

    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let result = run_tool("sleep", &["5"], None, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(ToolFailure::TimedOut)));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let output = run_tool(
            "sh",
            &["-c", "echo broken >&2; exit 3"],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(!output.success);
        assert_eq!(output.stderr, "broken");
    }

    #[tokio::test]
    async fn test_writer_reports_status() {
        let ok = run_writer("sh", &["-c", "cat > /dev/null"], "text", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(ok);

        let failed = run_writer("sh", &["-c", "exit 1"], "", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!failed);
    }

    #[test]
    fn test_tool_exists() {
        assert!(tool_exists("sh"));
        assert!(!tool_exists("textfix-definitely-not-installed"));
    }
}
