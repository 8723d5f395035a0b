//! Daemon module - main event loop orchestration
//!
//! Owns the hotkey service and the correction pipeline. Triggers come from
//! the hotkey, or from SIGUSR1 sent by `textfix correct` (compositor
//! keybindings). SIGHUP reloads the shortcut from the config file.

use crate::clipboard::{create_clipboard, transaction::ClipboardTransaction};
use crate::config::{load_config, Config};
use crate::correction::remote::RemoteCorrector;
use crate::error::{Result, TextfixError};
use crate::hotkey::{self, HotkeyAction, HotkeyService};
use crate::input::create_simulator;
use crate::notification::{DesktopNotifier, Toaster};
use crate::orchestrator::{Orchestrator, Outcome};
use crate::platform::Platform;
use crate::state::State;
use pidlock::Pidlock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Hotkey presses queued while the loop is busy
const TRIGGER_QUEUE: usize = 4;

/// Extra time given to a running correction on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Write state to file for external integrations (e.g., Waybar)
fn write_state_file(path: &Path, state: &str) {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", state);
    }
}

/// Remove a runtime file on shutdown
fn cleanup_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Write PID file for external control via signals
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = Config::runtime_dir().join("pid");

    // Ensure parent directory exists
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

/// PID of the running daemon, from its PID file
fn read_pid_file(path: &Path) -> Result<i32> {
    let contents = std::fs::read_to_string(path).map_err(|_| {
        TextfixError::Config(
            "textfix daemon is not running (no PID file). Start it with `textfix`, \
             or use `textfix correct --now`"
                .to_string(),
        )
    })?;

    contents
        .trim()
        .parse()
        .map_err(|_| TextfixError::Config(format!("Invalid PID file {:?}", path)))
}

/// Ask the running daemon to correct the current selection
#[cfg(unix)]
pub fn signal_running_daemon() -> Result<i32> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = read_pid_file(&Config::runtime_dir().join("pid"))?;
    kill(Pid::from_raw(pid), Signal::SIGUSR1).map_err(|e| {
        TextfixError::Config(format!("Failed to signal textfix daemon (pid {}): {}", pid, e))
    })?;
    Ok(pid)
}

#[cfg(not(unix))]
pub fn signal_running_daemon() -> Result<i32> {
    Err(TextfixError::Config(
        "Signaling the daemon is not supported on this platform, use `textfix correct --now`"
            .to_string(),
    ))
}

/// Only one daemon may own the hotkey
fn acquire_instance_lock() -> Result<Pidlock> {
    let runtime_dir = Config::runtime_dir();
    std::fs::create_dir_all(&runtime_dir)?;

    let lock_path = runtime_dir.join("textfix.lock");
    let lock_path_str = lock_path.to_string_lossy().to_string();
    let mut pidlock = Pidlock::new(&lock_path_str);

    pidlock.acquire().map_err(|_| {
        TextfixError::Config("Another textfix daemon is already running".to_string())
    })?;

    tracing::debug!("Acquired instance lock: {:?}", lock_path);
    Ok(pidlock)
}

/// Wire the clipboard, input, service and notice backends from config
pub fn build_orchestrator(config: &Config, platform: Platform) -> Result<Orchestrator> {
    let timeout = config.timing.command_timeout();

    let clipboard = create_clipboard(&config.clipboard, platform, timeout);
    if !clipboard.is_available() {
        tracing::warn!(
            "Clipboard tool {} not found in PATH, corrections will fail until it is installed",
            clipboard.name()
        );
    }

    let input = create_simulator(&config.input, platform, timeout);
    if !input.is_available() {
        tracing::warn!(
            "Key tool {} not found in PATH, corrections will fail until it is installed",
            input.name()
        );
    }

    let service = RemoteCorrector::new(&config.service)?;
    tracing::info!("Correction service: {}", config.service.endpoint);

    let toaster = Toaster::new(
        Arc::new(DesktopNotifier),
        config.notification.enabled,
        Duration::from_millis(config.notification.ttl_ms),
    );

    Ok(Orchestrator::new(
        ClipboardTransaction::new(clipboard, input, config.timing.clone()),
        Arc::new(service),
        toaster,
        &config.correction,
    ))
}

/// Mirror pipeline stages into the state file
fn spawn_state_writer(path: PathBuf, mut stages: watch::Receiver<State>) -> JoinHandle<()> {
    write_state_file(&path, State::Idle.as_str());
    tokio::spawn(async move {
        while stages.changed().await.is_ok() {
            let state = *stages.borrow_and_update();
            write_state_file(&path, state.as_str());
        }
    })
}

/// Start a correction unless one is already running
fn start_correction(orchestrator: &Arc<Orchestrator>, running: &mut Option<JoinHandle<Outcome>>) {
    if running.is_some() {
        tracing::info!("Correction already in progress, ignoring trigger");
        return;
    }
    let orchestrator = orchestrator.clone();
    *running = Some(tokio::spawn(async move { orchestrator.run(None).await }));
}

enum Control {
    Trigger,
    Reload,
    Shutdown(&'static str),
}

/// SIGUSR1, SIGHUP and SIGTERM
#[cfg(unix)]
struct ControlSignals {
    usr1: tokio::signal::unix::Signal,
    hup: tokio::signal::unix::Signal,
    term: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ControlSignals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let handler = |kind: SignalKind, name: &str| {
            signal(kind).map_err(|e| {
                TextfixError::Config(format!("Failed to set up {} handler: {}", name, e))
            })
        };

        Ok(Self {
            usr1: handler(SignalKind::user_defined1(), "SIGUSR1")?,
            hup: handler(SignalKind::hangup(), "SIGHUP")?,
            term: handler(SignalKind::terminate(), "SIGTERM")?,
        })
    }

    async fn recv(&mut self) -> Control {
        tokio::select! {
            _ = self.usr1.recv() => Control::Trigger,
            _ = self.hup.recv() => Control::Reload,
            _ = self.term.recv() => Control::Shutdown("SIGTERM"),
        }
    }
}

#[cfg(not(unix))]
struct ControlSignals;

#[cfg(not(unix))]
impl ControlSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Control {
        std::future::pending().await
    }
}

/// Main daemon that owns the hotkey and the correction pipeline
pub struct Daemon {
    config: Config,
    config_path: Option<PathBuf>,
    shortcut_override: Option<String>,
    state_file_path: Option<PathBuf>,
    pid_file_path: Option<PathBuf>,
}

impl Daemon {
    /// Create a new daemon with the given configuration
    ///
    /// `config_path` is re-read on SIGHUP.
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        let state_file_path = config.resolve_state_file();
        Self {
            config,
            config_path,
            shortcut_override: None,
            state_file_path,
            pid_file_path: None,
        }
    }

    /// Shortcut from the command line, kept across reloads
    pub fn with_shortcut_override(mut self, shortcut: Option<String>) -> Self {
        self.shortcut_override = shortcut;
        self
    }

    /// Run the daemon main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting textfix daemon");

        let mut lock = acquire_instance_lock()?;

        // Write PID file for external control via signals
        self.pid_file_path = write_pid_file();

        let mut signals = ControlSignals::install()?;

        let platform = Platform::detect();
        tracing::info!("Platform: {}", platform);

        let orchestrator = Arc::new(build_orchestrator(&self.config, platform)?);

        let state_writer = self.state_file_path.clone().map(|path| {
            tracing::info!("State file: {:?}", path);
            spawn_state_writer(path, orchestrator.subscribe())
        });

        let (trigger_tx, mut trigger_rx) = mpsc::channel(TRIGGER_QUEUE);
        let mut hotkeys = if self.config.hotkey.enabled {
            Some(self.start_hotkeys(platform, trigger_tx)?)
        } else {
            tracing::info!("Built-in hotkey disabled, use 'textfix correct' from a compositor keybinding");
            None
        };

        if let Some(shortcut) = hotkeys.as_ref().and_then(|h| h.active_shortcut()) {
            tracing::info!("Listening for hotkey: {}", shortcut);
        }

        let mut running: Option<JoinHandle<Outcome>> = None;
        let mut reload_pending = false;

        // Main event loop
        loop {
            tokio::select! {
                Some(()) = trigger_rx.recv() => {
                    start_correction(&orchestrator, &mut running);
                }

                control = signals.recv() => match control {
                    Control::Trigger => {
                        tracing::debug!("Received SIGUSR1");
                        start_correction(&orchestrator, &mut running);
                    }
                    Control::Reload => {
                        if running.is_some() {
                            tracing::info!("Received SIGHUP, reloading after the running correction");
                            reload_pending = true;
                        } else {
                            tracing::info!("Received SIGHUP, reloading shortcut");
                            self.reload(hotkeys.as_mut());
                        }
                    }
                    Control::Shutdown(name) => {
                        tracing::info!("Received {}, shutting down...", name);
                        break;
                    }
                },

                result = async {
                    match running.as_mut() {
                        Some(task) => task.await,
                        None => std::future::pending().await,
                    }
                } => {
                    running = None;
                    if let Err(e) = result {
                        tracing::error!("Correction task failed: {}", e);
                    }
                    if reload_pending {
                        reload_pending = false;
                        self.reload(hotkeys.as_mut());
                    }
                }

                // Handle graceful shutdown (SIGINT from Ctrl+C)
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }
            }
        }

        // Stop listening before anything else
        if let Some(mut service) = hotkeys.take() {
            service.destroy();
        }

        // Let a running correction put the clipboard back
        if let Some(task) = running.take() {
            tracing::info!("Waiting for the running correction to finish");
            let grace = Duration::from_secs(self.config.service.timeout_secs) + SHUTDOWN_GRACE;
            if tokio::time::timeout(grace, task).await.is_err() {
                tracing::warn!("Correction did not finish in time");
            }
        }

        if let Some(writer) = state_writer {
            writer.abort();
        }

        // Remove state file on shutdown
        if let Some(ref path) = self.state_file_path {
            cleanup_file(path);
        }

        // Remove PID file on shutdown
        if let Some(ref path) = self.pid_file_path {
            cleanup_file(path);
        }

        if lock.release().is_err() {
            tracing::warn!("Failed to release instance lock");
        }

        tracing::info!("Daemon stopped");

        Ok(())
    }

    /// Register the configured shortcut; presses only enqueue a trigger
    fn start_hotkeys(&self, platform: Platform, trigger: mpsc::Sender<()>) -> Result<HotkeyService> {
        let source = hotkey::create_source(self.config.hotkey.source)?;
        let mut service = HotkeyService::new(source, platform);

        let action: HotkeyAction = Arc::new(move || {
            if trigger.try_send(()).is_err() {
                tracing::debug!("Trigger queue full, dropping hotkey press");
            }
        });
        service.register(&self.config.hotkey.shortcut, action)?;

        Ok(service)
    }

    /// Re-read the config file and move the hotkey to its shortcut
    fn reload(&mut self, hotkeys: Option<&mut HotkeyService>) {
        let config = match load_config(self.config_path.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Reload failed, keeping current settings: {}", e);
                return;
            }
        };

        let shortcut = self
            .shortcut_override
            .clone()
            .unwrap_or(config.hotkey.shortcut);

        let Some(service) = hotkeys else {
            tracing::info!("Built-in hotkey disabled, nothing to reload");
            return;
        };

        match service.update_shortcut(&shortcut) {
            Ok(()) => {
                tracing::info!("Hotkey changed to {}", shortcut);
                self.config.hotkey.shortcut = shortcut;
            }
            Err(e) => tracing::warn!("Keeping hotkey {}: {}", self.config.hotkey.shortcut, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state");

        write_state_file(&path, State::Correcting.as_str());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "correcting");

        cleanup_file(&path);
        assert!(!path.exists());

        // Removing twice is harmless
        cleanup_file(&path);
    }

    #[test]
    fn test_read_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pid");

        assert!(matches!(read_pid_file(&path), Err(TextfixError::Config(_))));

        std::fs::write(&path, "4242\n").unwrap();
        assert_eq!(read_pid_file(&path).unwrap(), 4242);

        std::fs::write(&path, "not a pid").unwrap();
        assert!(read_pid_file(&path).is_err());
    }

    #[test]
    fn test_state_file_disabled() {
        let mut config = Config::default();
        config.state_file = Some("off".to_string());
        let daemon = Daemon::new(config, None);
        assert!(daemon.state_file_path.is_none());
    }
}
