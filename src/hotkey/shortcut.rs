//! Shortcut strings and canonical key names
//!
//! A shortcut is written as modifiers and keys joined by `+`, e.g.
//! `CTRL+SHIFT+/`. Key names are canonicalized so that symbols, aliases and
//! the names reported by the key sources all compare equal: `/`,
//! `slash` and `Forward Slash` are all `SLASH`.

use crate::error::ShortcutParseError;
use crate::platform::Platform;
use std::collections::BTreeSet;
use std::fmt;

/// Longest accepted shortcut string, in characters
pub const MAX_SHORTCUT_LEN: usize = 50;

/// Parsed shortcut: exact modifier flags plus the keys that trigger it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutSpec {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    /// Canonical non-modifier key names; never empty
    pub keys: BTreeSet<String>,
}

impl ShortcutSpec {
    /// Parse a user-supplied shortcut string
    pub fn parse(input: &str) -> Result<Self, ShortcutParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let len = trimmed.chars().count();
        if len > MAX_SHORTCUT_LEN {
            return Err(ShortcutParseError::TooLong(len));
        }

        let mut spec = ShortcutSpec {
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
            keys: BTreeSet::new(),
        };

        for segment in trimmed.split('+') {
            let token = segment.trim();
            if token.is_empty() {
                return Err(ShortcutParseError::EmptySegment(trimmed.to_string()));
            }

            match token.to_ascii_uppercase().as_str() {
                "CTRL" | "CONTROL" | "CTL" => spec.ctrl = true,
                "ALT" | "OPTION" | "OPT" => spec.alt = true,
                "SHIFT" => spec.shift = true,
                "META" | "CMD" | "COMMAND" | "SUPER" | "WIN" => spec.meta = true,
                _ => {
                    let key = canonical_key(token)
                        .ok_or_else(|| ShortcutParseError::UnknownKey(token.to_string()))?;
                    spec.keys.insert(key);
                }
            }
        }

        if spec.keys.is_empty() {
            return Err(ShortcutParseError::MissingKey(trimmed.to_string()));
        }

        Ok(spec)
    }

    /// Apply the platform's modifier convention
    ///
    /// macOS shortcuts are written with CTRL but pressed with CMD.
    pub fn normalized_for_platform(mut self, platform: Platform) -> Self {
        if platform == Platform::MacOs && self.ctrl {
            self.ctrl = false;
            self.meta = true;
        }
        self
    }
}

impl fmt::Display for ShortcutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        if self.ctrl {
            parts.push("CTRL");
        }
        if self.alt {
            parts.push("ALT");
        }
        if self.shift {
            parts.push("SHIFT");
        }
        if self.meta {
            parts.push("META");
        }
        parts.extend(self.keys.iter().map(String::as_str));
        f.write_str(&parts.join("+"))
    }
}

/// Canonical name for a key, or None if the name is unknown
///
/// Accepts single characters (`/`, `a`, `7`), case-insensitive names with
/// optional spaces, dashes or underscores (`page up`, `LEFT_BRACE`), and
/// evdev-style `KEY_` prefixes.
pub fn canonical_key(name: &str) -> Option<String> {
    let trimmed = name.trim();

    let mut chars = trimmed.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return canonical_char(c);
    }

    let upper = trimmed.to_ascii_uppercase();
    let upper = upper.strip_prefix("KEY_").unwrap_or(&upper);
    let compact: String = upper
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect();
    let mut compact_chars = compact.chars();
    match (compact_chars.next(), compact_chars.next()) {
        (None, _) => return None,
        (Some(c), None) => return canonical_char(c),
        _ => {}
    }

    if let Some(number) = compact.strip_prefix('F') {
        if let Ok(n) = number.parse::<u8>() {
            return (1..=24).contains(&n).then(|| format!("F{}", n));
        }
    }

    let canonical = match compact.as_str() {
        "SLASH" | "FORWARDSLASH" => "SLASH",
        "BACKSLASH" => "BACKSLASH",
        "COMMA" => "COMMA",
        "PERIOD" | "DOT" | "FULLSTOP" => "PERIOD",
        "SEMICOLON" => "SEMICOLON",
        "QUOTE" | "APOSTROPHE" => "QUOTE",
        "LEFTBRACE" | "LEFTBRACKET" | "BRACKETLEFT" => "LEFTBRACE",
        "RIGHTBRACE" | "RIGHTBRACKET" | "BRACKETRIGHT" => "RIGHTBRACE",
        "MINUS" | "DASH" | "HYPHEN" => "MINUS",
        "EQUAL" | "EQUALS" => "EQUAL",
        "GRAVE" | "BACKTICK" | "BACKQUOTE" => "GRAVE",
        "SPACE" | "SPACEBAR" => "SPACE",
        "ENTER" | "RETURN" => "ENTER",
        "TAB" => "TAB",
        "ESCAPE" | "ESC" => "ESCAPE",
        "BACKSPACE" => "BACKSPACE",
        "DELETE" | "DEL" => "DELETE",
        "INSERT" | "INS" => "INSERT",
        "HOME" => "HOME",
        "END" => "END",
        "PAGEUP" | "PGUP" => "PAGEUP",
        "PAGEDOWN" | "PGDN" => "PAGEDOWN",
        "UP" | "UPARROW" | "ARROWUP" => "UP",
        "DOWN" | "DOWNARROW" | "ARROWDOWN" => "DOWN",
        "LEFT" | "LEFTARROW" | "ARROWLEFT" => "LEFT",
        "RIGHT" | "RIGHTARROW" | "ARROWRIGHT" => "RIGHT",
        "CAPSLOCK" => "CAPSLOCK",
        "SCROLLLOCK" => "SCROLLLOCK",
        "NUMLOCK" => "NUMLOCK",
        "PAUSE" => "PAUSE",
        "PRINTSCREEN" | "PRINT" | "SYSRQ" => "PRINTSCREEN",
        _ => return None,
    };
    Some(canonical.to_string())
}

fn canonical_char(c: char) -> Option<String> {
    if c.is_ascii_alphanumeric() {
        return Some(c.to_ascii_uppercase().to_string());
    }
    let name = match c {
        '/' => "SLASH",
        '\\' => "BACKSLASH",
        ',' => "COMMA",
        '.' => "PERIOD",
        ';' => "SEMICOLON",
        '\'' => "QUOTE",
        '[' => "LEFTBRACE",
        ']' => "RIGHTBRACE",
        '-' => "MINUS",
        '=' => "EQUAL",
        '`' => "GRAVE",
        _ => return None,
    };
    Some(name.to_string())
}
