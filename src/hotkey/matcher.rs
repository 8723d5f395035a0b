//! Key event tracking and shortcut matching
//!
//! Key sources feed raw press/release notifications into a
//! [`KeyboardTracker`], which keeps modifier state and turns a press of an
//! already-held key into a repeat. [`HotkeyMatcher`] then fires only on the
//! initial press with exactly the configured modifiers held.

use super::shortcut::{canonical_key, ShortcutSpec};
use std::collections::HashSet;

/// Physical modifier keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
    LeftShift,
    RightShift,
    LeftMeta,
    RightMeta,
}

impl ModifierKey {
    /// Recognize a canonical modifier key name as reported by a source
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "LEFTCTRL" => Some(ModifierKey::LeftCtrl),
            "RIGHTCTRL" => Some(ModifierKey::RightCtrl),
            "LEFTALT" => Some(ModifierKey::LeftAlt),
            "RIGHTALT" => Some(ModifierKey::RightAlt),
            "LEFTSHIFT" => Some(ModifierKey::LeftShift),
            "RIGHTSHIFT" => Some(ModifierKey::RightShift),
            "LEFTMETA" => Some(ModifierKey::LeftMeta),
            "RIGHTMETA" => Some(ModifierKey::RightMeta),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Held flags for each physical modifier key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    held: u8,
}

impl ModifierState {
    pub fn set(&mut self, key: ModifierKey, held: bool) {
        if held {
            self.held |= key.bit();
        } else {
            self.held &= !key.bit();
        }
    }

    pub fn with(mut self, key: ModifierKey) -> Self {
        self.set(key, true);
        self
    }

    pub fn is_held(&self, key: ModifierKey) -> bool {
        self.held & key.bit() != 0
    }

    pub fn ctrl(&self) -> bool {
        self.is_held(ModifierKey::LeftCtrl) || self.is_held(ModifierKey::RightCtrl)
    }

    pub fn alt(&self) -> bool {
        self.is_held(ModifierKey::LeftAlt) || self.is_held(ModifierKey::RightAlt)
    }

    pub fn shift(&self) -> bool {
        self.is_held(ModifierKey::LeftShift) || self.is_held(ModifierKey::RightShift)
    }

    pub fn meta(&self) -> bool {
        self.is_held(ModifierKey::LeftMeta) || self.is_held(ModifierKey::RightMeta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Down,
    Repeat,
    Up,
}

/// One key transition with the modifiers held at that moment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key name as reported by the source
    pub key: String,
    pub transition: Transition,
    pub modifiers: ModifierState,
}

/// Per-source keyboard state
#[derive(Debug, Default)]
pub struct KeyboardTracker {
    held: HashSet<String>,
    modifiers: ModifierState,
}

impl KeyboardTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A key went down; a second press without release is a repeat
    pub fn press(&mut self, key: &str) -> KeyEvent {
        if let Some(modifier) = ModifierKey::from_name(key) {
            self.modifiers.set(modifier, true);
        }
        let transition = if self.held.insert(key.to_string()) {
            Transition::Down
        } else {
            Transition::Repeat
        };
        self.event(key, transition)
    }

    /// Auto-repeat reported explicitly by the source
    pub fn repeat(&mut self, key: &str) -> KeyEvent {
        self.held.insert(key.to_string());
        self.event(key, Transition::Repeat)
    }

    pub fn release(&mut self, key: &str) -> KeyEvent {
        if let Some(modifier) = ModifierKey::from_name(key) {
            self.modifiers.set(modifier, false);
        }
        self.held.remove(key);
        self.event(key, Transition::Up)
    }

    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }

    fn event(&self, key: &str, transition: Transition) -> KeyEvent {
        KeyEvent {
            key: key.to_string(),
            transition,
            modifiers: self.modifiers,
        }
    }
}

/// Decides whether an event triggers a shortcut
#[derive(Debug, Clone)]
pub struct HotkeyMatcher {
    spec: ShortcutSpec,
}

impl HotkeyMatcher {
    pub fn new(spec: ShortcutSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ShortcutSpec {
        &self.spec
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        if event.transition != Transition::Down {
            return false;
        }

        // Extra modifiers reject the match
        let mods = &event.modifiers;
        if mods.ctrl() != self.spec.ctrl
            || mods.alt() != self.spec.alt
            || mods.shift() != self.spec.shift
            || mods.meta() != self.spec.meta
        {
            return false;
        }

        canonical_key(&event.key).is_some_and(|key| self.spec.keys.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(shortcut: &str) -> HotkeyMatcher {
        HotkeyMatcher::new(ShortcutSpec::parse(shortcut).unwrap())
    }

    fn down(key: &str, modifiers: ModifierState) -> KeyEvent {
        KeyEvent {
            key: key.to_string(),
            transition: Transition::Down,
            modifiers,
        }
    }

    fn ctrl_shift() -> ModifierState {
        ModifierState::default()
            .with(ModifierKey::LeftCtrl)
            .with(ModifierKey::LeftShift)
    }

    #[test]
    fn test_exact_modifiers_match() {
        let m = matcher("CTRL+SHIFT+/");
        assert!(m.matches(&down("SLASH", ctrl_shift())));
        assert!(m.matches(&down("/", ctrl_shift())));

        // Right-hand modifiers count the same
        let right = ModifierState::default()
            .with(ModifierKey::RightCtrl)
            .with(ModifierKey::RightShift);
        assert!(m.matches(&down("SLASH", right)));
    }

    #[test]
    fn test_extra_or_missing_modifier_rejects() {
        let m = matcher("CTRL+SHIFT+/");
        assert!(!m.matches(&down("SLASH", ctrl_shift().with(ModifierKey::LeftAlt))));
        assert!(!m.matches(&down("SLASH", ctrl_shift().with(ModifierKey::RightMeta))));
        assert!(!m.matches(&down(
            "SLASH",
            ModifierState::default().with(ModifierKey::LeftCtrl)
        )));
    }

    #[test]
    fn test_only_down_transitions_match() {
        let m = matcher("CTRL+SHIFT+/");
        for transition in [Transition::Repeat, Transition::Up] {
            let event = KeyEvent {
                key: "SLASH".to_string(),
                transition,
                modifiers: ctrl_shift(),
            };
            assert!(!m.matches(&event));
        }
    }

    #[test]
    fn test_wrong_key_rejects() {
        let m = matcher("CTRL+SHIFT+/");
        assert!(!m.matches(&down("PERIOD", ctrl_shift())));
        assert!(!m.matches(&down("UNKNOWN_KEY", ctrl_shift())));
    }

    #[test]
    fn test_tracker_fires_once_per_press() {
        let m = matcher("CTRL+SHIFT+/");
        let mut tracker = KeyboardTracker::new();
        tracker.press("LEFTCTRL");
        tracker.press("LEFTSHIFT");

        // A held key keeps reporting presses; only the first is a Down
        let fired = (0..5)
            .map(|_| tracker.press("SLASH"))
            .filter(|event| m.matches(event))
            .count();
        assert_eq!(fired, 1);

        tracker.release("SLASH");
        assert!(m.matches(&tracker.press("SLASH")));
    }

    #[test]
    fn test_tracker_modifier_release() {
        let mut tracker = KeyboardTracker::new();
        tracker.press("RIGHTALT");
        assert!(tracker.modifiers().alt());
        let event = tracker.release("RIGHTALT");
        assert_eq!(event.transition, Transition::Up);
        assert!(!tracker.modifiers().alt());
    }

    #[test]
    fn test_explicit_repeat() {
        let mut tracker = KeyboardTracker::new();
        tracker.press("A");
        assert_eq!(tracker.repeat("A").transition, Transition::Repeat);
        assert_eq!(tracker.press("A").transition, Transition::Repeat);
    }
}
