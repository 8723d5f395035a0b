//! Desktop platform detection
//!
//! Backend selection (clipboard helpers, chord tools, key sources) depends
//! on the OS and, on Linux, on the display server.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Wayland,
    X11,
}

impl Platform {
    /// Detect the running platform
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            return Platform::MacOs;
        }
        if cfg!(target_os = "windows") {
            return Platform::Windows;
        }
        Self::from_session(
            std::env::var("WAYLAND_DISPLAY").ok().as_deref(),
            std::env::var("XDG_SESSION_TYPE").ok().as_deref(),
        )
    }

    /// Classify a Unix desktop session from its environment
    pub fn from_session(wayland_display: Option<&str>, session_type: Option<&str>) -> Self {
        if wayland_display.is_some_and(|d| !d.is_empty()) {
            return Platform::Wayland;
        }
        match session_type {
            Some(kind) if kind.eq_ignore_ascii_case("wayland") => Platform::Wayland,
            _ => Platform::X11,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::MacOs => "macOS",
            Platform::Windows => "Windows",
            Platform::Wayland => "Wayland",
            Platform::X11 => "X11",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_detection() {
        assert_eq!(Platform::from_session(Some("wayland-0"), None), Platform::Wayland);
        assert_eq!(Platform::from_session(None, Some("wayland")), Platform::Wayland);
        assert_eq!(Platform::from_session(Some(""), Some("x11")), Platform::X11);
        assert_eq!(Platform::from_session(None, None), Platform::X11);
    }
}
