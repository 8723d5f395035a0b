//! Global hotkey detection
//!
//! A [`KeySource`] delivers system-wide key events to a single installed
//! handler. [`HotkeyService`] owns the source and at most one registration:
//! registering a new shortcut tears the previous hook down completely
//! before installing the next one.
//!
//! Sources:
//! - Linux: evdev, kernel-level events from /dev/input (works on X11 and
//!   all Wayland compositors; requires the 'input' group)
//! - macOS/Windows/X11: rdev global listener (macOS needs Accessibility
//!   permission)

pub mod matcher;
pub mod rdev_source;
pub mod shortcut;

#[cfg(target_os = "linux")]
pub mod evdev_source;

use crate::config::KeySourceKind;
use crate::error::HotkeyError;
use crate::platform::Platform;
use matcher::{HotkeyMatcher, KeyEvent};
use shortcut::ShortcutSpec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback receiving every key event from a source
pub type KeyHandler = Box<dyn FnMut(&KeyEvent) + Send>;

/// Action bound to a shortcut. Runs on the source's thread, so it must not
/// block; the daemon's action only enqueues a trigger.
pub type HotkeyAction = Arc<dyn Fn() + Send + Sync>;

/// Origin of system-wide key events
pub trait KeySource: Send {
    /// Start delivering events to `handler` until the returned hook is
    /// uninstalled
    fn install(&mut self, handler: KeyHandler) -> Result<Box<dyn KeyHook>, HotkeyError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// An installed handler
pub trait KeyHook: Send {
    /// Stop delivering events. Returns once the handler will not run again;
    /// calling it twice is harmless.
    fn uninstall(&mut self);
}

struct Registration {
    spec: ShortcutSpec,
    action: HotkeyAction,
    hook: Box<dyn KeyHook>,
}

/// Owns the key source and the active shortcut registration
pub struct HotkeyService {
    source: Box<dyn KeySource>,
    platform: Platform,
    active: Option<Registration>,
    enabled: Arc<AtomicBool>,
    destroyed: bool,
}

impl HotkeyService {
    pub fn new(source: Box<dyn KeySource>, platform: Platform) -> Self {
        Self {
            source,
            platform,
            active: None,
            enabled: Arc::new(AtomicBool::new(true)),
            destroyed: false,
        }
    }

    /// Bind `action` to `shortcut`, replacing any previous registration
    ///
    /// A shortcut that fails to parse leaves the previous one active.
    pub fn register(&mut self, shortcut: &str, action: HotkeyAction) -> Result<(), HotkeyError> {
        if self.destroyed {
            return Err(HotkeyError::Destroyed);
        }

        let spec = ShortcutSpec::parse(shortcut)?.normalized_for_platform(self.platform);

        let previous = self.active.take().map(|mut registration| {
            registration.hook.uninstall();
            (registration.spec, registration.action)
        });

        match self.install(spec.clone(), action.clone()) {
            Ok(hook) => {
                tracing::info!("Hotkey registered: {} (via {})", spec, self.source.name());
                self.active = Some(Registration { spec, action, hook });
                Ok(())
            }
            Err(e) => {
                // Put the old shortcut back so the user is not left without one
                if let Some((old_spec, old_action)) = previous {
                    match self.install(old_spec.clone(), old_action.clone()) {
                        Ok(hook) => {
                            self.active = Some(Registration {
                                spec: old_spec,
                                action: old_action,
                                hook,
                            })
                        }
                        Err(restore_err) => {
                            tracing::error!("Failed to reinstall previous hotkey: {}", restore_err)
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Re-register the current action under a new shortcut
    pub fn update_shortcut(&mut self, shortcut: &str) -> Result<(), HotkeyError> {
        if self.destroyed {
            return Err(HotkeyError::Destroyed);
        }
        let action = self
            .active
            .as_ref()
            .map(|registration| registration.action.clone())
            .ok_or(HotkeyError::NotRegistered)?;
        self.register(shortcut, action)
    }

    /// Stop listening for good
    pub fn destroy(&mut self) {
        if let Some(mut registration) = self.active.take() {
            registration.hook.uninstall();
            tracing::debug!("Hotkey {} unregistered", registration.spec);
        }
        self.destroyed = true;
    }

    /// Resume firing after [`disable`](Self::disable)
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Suspend firing without removing the hook
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn active_shortcut(&self) -> Option<&ShortcutSpec> {
        self.active.as_ref().map(|registration| &registration.spec)
    }

    fn install(&mut self, spec: ShortcutSpec, action: HotkeyAction) -> Result<Box<dyn KeyHook>, HotkeyError> {
        let matcher = HotkeyMatcher::new(spec);
        let enabled = self.enabled.clone();
        self.source.install(Box::new(move |event: &KeyEvent| {
            if enabled.load(Ordering::SeqCst) && matcher.matches(event) {
                tracing::debug!("Hotkey {} pressed", matcher.spec());
                action();
            }
        }))
    }
}

impl Drop for HotkeyService {
    fn drop(&mut self) {
        if let Some(mut registration) = self.active.take() {
            registration.hook.uninstall();
        }
    }
}

/// Create the key source for this platform
pub fn create_source(kind: KeySourceKind) -> Result<Box<dyn KeySource>, HotkeyError> {
    match kind {
        KeySourceKind::Auto => default_source(),
        KeySourceKind::Evdev => evdev(),
        KeySourceKind::Rdev => Ok(Box::new(rdev_source::RdevSource::new())),
    }
}

#[cfg(target_os = "linux")]
fn default_source() -> Result<Box<dyn KeySource>, HotkeyError> {
    evdev()
}

#[cfg(not(target_os = "linux"))]
fn default_source() -> Result<Box<dyn KeySource>, HotkeyError> {
    Ok(Box::new(rdev_source::RdevSource::new()))
}

#[cfg(target_os = "linux")]
fn evdev() -> Result<Box<dyn KeySource>, HotkeyError> {
    Ok(Box::new(evdev_source::EvdevSource::new()?))
}

#[cfg(not(target_os = "linux"))]
fn evdev() -> Result<Box<dyn KeySource>, HotkeyError> {
    Err(HotkeyError::Listen(
        "the evdev key source is only available on Linux".to_string(),
    ))
}
