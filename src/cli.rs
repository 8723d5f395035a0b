// Command-line interface definitions for textfix
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "textfix")]
#[command(author, version, about = "Select text anywhere, press a hotkey, get it corrected in place")]
#[command(long_about = "
Textfix corrects the text selected in any application.
Select some text, press the hotkey, and the selection is replaced with the
corrected version. Your clipboard is left as it was.

SETUP:
  1. Linux: add yourself to the input group: sudo usermod -aG input $USER
  2. Install a clipboard tool (wl-clipboard or xclip) and a key tool
     (ydotool on Wayland, xdotool on X11)
  3. macOS: grant Accessibility permission to your terminal
  4. Run: textfix config --init (to write the default config)
  5. Run: textfix (to start the daemon)

USAGE:
  Select text and press Ctrl+Shift+/ (Cmd+Shift+/ on macOS).
  Compositor keybindings can run `textfix correct` instead.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the hotkey (e.g., CTRL+SHIFT+/, ALT+F9)
    #[arg(long, value_name = "SHORTCUT")]
    pub shortcut: Option<String>,

    /// Override the correction language (pt, en, es)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Override the correction service URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Correct the current selection
    ///
    /// Signals the running daemon (for compositor keybindings).
    Correct {
        /// Run the correction in this process instead of signaling the daemon
        #[arg(long)]
        now: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },

    /// Parse a shortcut and print its canonical form
    CheckShortcut {
        /// Shortcut such as CTRL+SHIFT+/
        shortcut: String,
    },
}
