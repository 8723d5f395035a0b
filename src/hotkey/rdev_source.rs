//! rdev key source (macOS, Windows, X11)
//!
//! rdev's `listen()` blocks forever and cannot be unhooked, so the OS
//! listener thread is started once per source. Hooks take turns in a single
//! handler slot; uninstalling empties the slot. The slot lock is held while
//! the handler runs, so once `uninstall` returns the handler will not be
//! called again.
//!
//! On macOS the terminal or app needs Accessibility permission, otherwise
//! the listener never receives events.

use super::matcher::KeyboardTracker;
use super::{KeyHandler, KeyHook, KeySource};
use crate::error::HotkeyError;
use rdev::{listen, Event, EventType, Key};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// How long to wait for an immediate listener failure
const STARTUP_GRACE: Duration = Duration::from_millis(200);

struct Slot {
    id: u64,
    handler: KeyHandler,
}

type SharedSlot = Arc<Mutex<Option<Slot>>>;

/// Global listener with one handler slot
pub struct RdevSource {
    slot: SharedSlot,
    next_id: u64,
    started: bool,
}

impl RdevSource {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_id: 0,
            started: false,
        }
    }

    fn start_listener(&mut self) -> Result<(), HotkeyError> {
        let slot = self.slot.clone();
        let (error_tx, error_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("textfix-rdev".to_string())
            .spawn(move || {
                let mut tracker = KeyboardTracker::new();
                let callback = move |event: Event| {
                    let key_event = match event.event_type {
                        EventType::KeyPress(key) => key_name(key).map(|name| tracker.press(name)),
                        EventType::KeyRelease(key) => {
                            key_name(key).map(|name| tracker.release(name))
                        }
                        _ => None,
                    };
                    let Some(key_event) = key_event else {
                        return;
                    };

                    let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(active) = slot.as_mut() {
                        (active.handler)(&key_event);
                    }
                };

                // This blocks until an error occurs or the process exits
                if let Err(e) = listen(callback) {
                    tracing::error!("rdev listen error: {:?}", e);
                    let _ = error_tx.send(format!("{:?}", e));
                }
            })
            .map_err(|e| HotkeyError::Listen(format!("failed to spawn listener thread: {}", e)))?;

        match error_rx.recv_timeout(STARTUP_GRACE) {
            Ok(message) => Err(HotkeyError::Listen(format!(
                "{}. On macOS, grant Accessibility permission in System Settings > Privacy & Security > Accessibility",
                message
            ))),
            // Still listening
            Err(_) => Ok(()),
        }
    }
}

impl Default for RdevSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for RdevSource {
    fn install(&mut self, handler: KeyHandler) -> Result<Box<dyn KeyHook>, HotkeyError> {
        if !self.started {
            self.start_listener()?;
            self.started = true;
        }

        self.next_id += 1;
        let id = self.next_id;

        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            tracing::warn!("Replacing a key handler that was never uninstalled");
        }
        *slot = Some(Slot { id, handler });

        Ok(Box::new(RdevHook {
            slot: self.slot.clone(),
            id,
        }))
    }

    fn name(&self) -> &'static str {
        "rdev"
    }
}

struct RdevHook {
    slot: SharedSlot,
    id: u64,
}

impl KeyHook for RdevHook {
    fn uninstall(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        // Only clear the slot if it still holds this hook's handler
        if slot.as_ref().is_some_and(|active| active.id == self.id) {
            *slot = None;
            tracing::debug!("rdev hook uninstalled");
        }
    }
}

impl Drop for RdevHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Canonical name of an rdev key
fn key_name(key: Key) -> Option<&'static str> {
    let name = match key {
        // Modifiers
        Key::ControlLeft => "LEFTCTRL",
        Key::ControlRight => "RIGHTCTRL",
        Key::Alt => "LEFTALT",
        Key::AltGr => "RIGHTALT",
        Key::ShiftLeft => "LEFTSHIFT",
        Key::ShiftRight => "RIGHTSHIFT",
        Key::MetaLeft => "LEFTMETA",
        Key::MetaRight => "RIGHTMETA",

        // Letters
        Key::KeyA => "A",
        Key::KeyB => "B",
        Key::KeyC => "C",
        Key::KeyD => "D",
        Key::KeyE => "E",
        Key::KeyF => "F",
        Key::KeyG => "G",
        Key::KeyH => "H",
        Key::KeyI => "I",
        Key::KeyJ => "J",
        Key::KeyK => "K",
        Key::KeyL => "L",
        Key::KeyM => "M",
        Key::KeyN => "N",
        Key::KeyO => "O",
        Key::KeyP => "P",
        Key::KeyQ => "Q",
        Key::KeyR => "R",
        Key::KeyS => "S",
        Key::KeyT => "T",
        Key::KeyU => "U",
        Key::KeyV => "V",
        Key::KeyW => "W",
        Key::KeyX => "X",
        Key::KeyY => "Y",
        Key::KeyZ => "Z",

        // Digits
        Key::Num0 => "0",
        Key::Num1 => "1",
        Key::Num2 => "2",
        Key::Num3 => "3",
        Key::Num4 => "4",
        Key::Num5 => "5",
        Key::Num6 => "6",
        Key::Num7 => "7",
        Key::Num8 => "8",
        Key::Num9 => "9",

        // Function keys
        Key::F1 => "F1",
        Key::F2 => "F2",
        Key::F3 => "F3",
        Key::F4 => "F4",
        Key::F5 => "F5",
        Key::F6 => "F6",
        Key::F7 => "F7",
        Key::F8 => "F8",
        Key::F9 => "F9",
        Key::F10 => "F10",
        Key::F11 => "F11",
        Key::F12 => "F12",

        // Symbols
        Key::Slash => "SLASH",
        Key::BackSlash | Key::IntlBackslash => "BACKSLASH",
        Key::Comma => "COMMA",
        Key::Dot => "PERIOD",
        Key::SemiColon => "SEMICOLON",
        Key::Quote => "QUOTE",
        Key::LeftBracket => "LEFTBRACE",
        Key::RightBracket => "RIGHTBRACE",
        Key::Minus => "MINUS",
        Key::Equal => "EQUAL",
        Key::BackQuote => "GRAVE",

        // Editing and navigation
        Key::Space => "SPACE",
        Key::Return => "ENTER",
        Key::Tab => "TAB",
        Key::Escape => "ESCAPE",
        Key::Backspace => "BACKSPACE",
        Key::Delete => "DELETE",
        Key::Insert => "INSERT",
        Key::Home => "HOME",
        Key::End => "END",
        Key::PageUp => "PAGEUP",
        Key::PageDown => "PAGEDOWN",
        Key::UpArrow => "UP",
        Key::DownArrow => "DOWN",
        Key::LeftArrow => "LEFT",
        Key::RightArrow => "RIGHT",

        // Locks
        Key::CapsLock => "CAPSLOCK",
        Key::ScrollLock => "SCROLLLOCK",
        Key::NumLock => "NUMLOCK",
        Key::Pause => "PAUSE",
        Key::PrintScreen => "PRINTSCREEN",

        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::matcher::KeyEvent;
    use crate::hotkey::shortcut::canonical_key;

    #[test]
    fn test_key_names_are_canonical() {
        for key in [Key::Slash, Key::Dot, Key::Quote, Key::KeyQ, Key::Num7, Key::F12] {
            let name = key_name(key).unwrap();
            assert_eq!(canonical_key(name).as_deref(), Some(name));
        }
        assert_eq!(key_name(Key::Unknown(999)), None);
    }

    #[test]
    fn test_hook_slot_ownership() {
        let slot: SharedSlot = Arc::new(Mutex::new(None));
        *slot.lock().unwrap() = Some(Slot {
            id: 2,
            handler: Box::new(|_: &KeyEvent| {}),
        });

        // A stale hook must not clear its successor's handler
        let mut stale = RdevHook {
            slot: slot.clone(),
            id: 1,
        };
        stale.uninstall();
        assert!(slot.lock().unwrap().is_some());

        let mut current = RdevHook {
            slot: slot.clone(),
            id: 2,
        };
        current.uninstall();
        assert!(slot.lock().unwrap().is_none());
    }
}
