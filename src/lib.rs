//! Textfix: select text anywhere, press a hotkey, get it corrected in place
//!
//! This library provides the core functionality for:
//! - Detecting a global shortcut via evdev (Linux) or rdev (macOS, Windows, X11)
//! - Capturing the selection through a clipboard transaction that always
//!   restores the user's clipboard
//! - Correcting the text with a remote correction service
//! - Pasting the corrected text back through simulated copy/paste chords
//! - Reporting the outcome with a short-lived desktop notice
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────┐   trigger    ┌──────────────────────────────┐
//!          │    Hotkey    │ ───────────▶ │            Daemon            │ ◀── SIGUSR1
//!          │ (evdev/rdev) │              └──────────────────────────────┘
//!          └──────────────┘                             │
//!                                                       ▼
//!                                              ┌──────────────┐
//!                                              │ Orchestrator │ (single flight)
//!                                              └──────────────┘
//!                    ┌──────────────────────────────┼──────────────────────┐
//!                    ▼                              ▼                      ▼
//!          ┌──────────────────┐            ┌──────────────┐        ┌──────────────┐
//!          │    Clipboard     │            │  Correction  │        │    Toaster   │
//!          │   Transaction    │            │   (remote)   │        │   (notices)  │
//!          └──────────────────┘            └──────────────┘        └──────────────┘
//!             │            │
//!             ▼            ▼
//!      ┌────────────┐ ┌────────────┐
//!      │ Clipboard  │ │   Input    │
//!      │  backend   │ │ simulator  │
//!      └────────────┘ └────────────┘
//! ```

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod correction;
pub mod daemon;
pub mod error;
pub mod hotkey;
pub mod input;
pub mod notification;
pub mod orchestrator;
pub mod platform;
pub mod process;
pub mod state;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Result, TextfixError};
pub use orchestrator::{Orchestrator, Outcome};
