//! evdev key source
//!
//! Uses the Linux evdev interface to read key events at the kernel level.
//! This works on X11 and all Wayland compositors because it bypasses the
//! display server. The user must be in the 'input' group to access
//! /dev/input/* devices.
//!
//! Each installed hook owns a reader thread; uninstalling stops and joins it.
//! Modifier state lives in the source and outlives hooks, so a shortcut
//! swapped in while keys are held still sees them.

use super::matcher::{KeyboardTracker, ModifierKey};
use super::shortcut::canonical_key;
use super::{KeyHandler, KeyHook, KeySource};
use crate::error::HotkeyError;
use evdev::{Device, InputEventKind, Key};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

/// Poll interval of the non-blocking reader loop
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Kernel-level keyboard events
pub struct EvdevSource {
    device_paths: Vec<PathBuf>,
    tracker: Arc<Mutex<KeyboardTracker>>,
}

impl EvdevSource {
    pub fn new() -> Result<Self, HotkeyError> {
        let device_paths = find_keyboard_devices()?;

        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            device_paths,
            tracker: Arc::new(Mutex::new(KeyboardTracker::new())),
        })
    }
}

impl KeySource for EvdevSource {
    fn install(&mut self, handler: KeyHandler) -> Result<Box<dyn KeyHook>, HotkeyError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let paths = self.device_paths.clone();
        let tracker = self.tracker.clone();
        let thread_stop = stop.clone();
        let thread = std::thread::Builder::new()
            .name("textfix-evdev".to_string())
            .spawn(move || {
                let devices = match open_devices(&paths) {
                    Ok(devices) => {
                        let _ = ready_tx.send(Ok(()));
                        devices
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Releases while no hook was installed went unseen
                resync_tracker(&mut lock(&tracker), held_keys(&devices));
                reader_loop(devices, handler, &tracker, &thread_stop);
            })
            .map_err(|e| HotkeyError::Listen(format!("failed to spawn reader thread: {}", e)))?;

        // Report device errors to the caller instead of a silent dead thread
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(EvdevHook {
                stop,
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(HotkeyError::Listen("reader thread exited during startup".to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "evdev"
    }
}

struct EvdevHook {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl KeyHook for EvdevHook {
    fn uninstall(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("evdev reader thread panicked");
            }
            tracing::debug!("evdev hook uninstalled");
        }
    }
}

impl Drop for EvdevHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Open keyboard devices in non-blocking mode
fn open_devices(paths: &[PathBuf]) -> Result<Vec<Device>, HotkeyError> {
    let devices: Vec<Device> = paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                // Set device to non-blocking mode so fetch_events doesn't block
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        return Err(HotkeyError::NoKeyboard);
    }
    Ok(devices)
}

/// Keys the kernel reports as down on any of `devices`
fn held_keys(devices: &[Device]) -> Vec<Key> {
    devices
        .iter()
        .filter_map(|device| device.get_key_state().ok())
        .flat_map(|state| state.iter().collect::<Vec<_>>())
        .collect()
}

/// Reset `tracker` to exactly the `held` keys
fn resync_tracker(tracker: &mut KeyboardTracker, held: Vec<Key>) {
    *tracker = KeyboardTracker::new();
    for name in held.into_iter().filter_map(key_name) {
        tracker.press(&name);
    }
}

/// A panicked reader leaves the state usable
fn lock(tracker: &Mutex<KeyboardTracker>) -> MutexGuard<'_, KeyboardTracker> {
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Deliver events to `handler` until `stop` is set
fn reader_loop(
    mut devices: Vec<Device>,
    mut handler: KeyHandler,
    tracker: &Mutex<KeyboardTracker>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        // Poll each device (all set to non-blocking mode)
        for device in &mut devices {
            let Ok(events) = device.fetch_events() else {
                continue;
            };
            for event in events {
                let InputEventKind::Key(key) = event.kind() else {
                    continue;
                };
                let Some(name) = key_name(key) else {
                    continue;
                };

                let key_event = match event.value() {
                    1 => lock(tracker).press(&name),
                    2 => lock(tracker).repeat(&name),
                    0 => lock(tracker).release(&name),
                    _ => continue,
                };
                handler(&key_event);
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    tracing::debug!("evdev reader stopping");
}

/// Canonical name of an evdev key: modifier names as-is, everything else
/// through the shortcut key table
fn key_name(key: Key) -> Option<String> {
    let debug = format!("{:?}", key);
    let raw = debug.strip_prefix("KEY_")?;
    if ModifierKey::from_name(raw).is_some() {
        return Some(raw.to_string());
    }
    canonical_key(raw)
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        // Only look at event* devices
        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}
