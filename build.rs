//! Man pages for textfix
//!
//! Renders `textfix.1` and one `textfix-<command>.1` page per subcommand
//! from the clap definitions, then appends the sections clap knows nothing
//! about: where files live, which variables are read, how the daemon reacts
//! to signals.

use clap::CommandFactory;
use clap_mangen::Man;
use std::env;
use std::fs;
use std::io::{Error, Write};
use std::path::{Path, PathBuf};

include!("src/cli.rs");

const SOURCE: &str = concat!("textfix ", env!("CARGO_PKG_VERSION"));
const MANUAL: &str = "Textfix Manual";

const FILES: &str = r#".SH FILES
.TP
\fI$XDG_CONFIG_HOME/textfix/config.toml\fR
Configuration; \fBtextfix config \-\-init\fR writes the defaults.
.TP
\fI$XDG_RUNTIME_DIR/textfix/pid\fR
Process id of the running daemon, read by \fBtextfix correct\fR.
.TP
\fI$XDG_RUNTIME_DIR/textfix/state\fR
Current stage of the daemon: idle, capturing, correcting or injecting.
"#;

const ENVIRONMENT: &str = r#".SH ENVIRONMENT
.TP
\fBTEXTFIX_SHORTCUT\fR, \fBTEXTFIX_LANGUAGE\fR, \fBTEXTFIX_ENDPOINT\fR
Override the matching config file values.
.TP
\fBTEXTFIX_API_TOKEN\fR
Bearer token for the correction service when none is configured.
"#;

const SIGNALS: &str = r#".SH SIGNALS
.TP
\fBSIGUSR1\fR
Correct the current selection, as if the hotkey was pressed.
.TP
\fBSIGHUP\fR
Re-read the shortcut from the config file.
.TP
\fBSIGTERM\fR
Finish the running correction and exit.
"#;

fn main() -> Result<(), Error> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=TEXTFIX_GEN_MANPAGES");

    let wanted = env::var_os("TEXTFIX_GEN_MANPAGES").is_some()
        || env::var("PROFILE").is_ok_and(|profile| profile == "release");
    if !wanted {
        return Ok(());
    }

    let out_dir = env::var_os("OUT_DIR").map_or_else(|| PathBuf::from("target"), PathBuf::from);
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;

    let cli = Cli::command();
    render(&man_dir, "textfix", cli.clone(), &[FILES, ENVIRONMENT, SIGNALS])?;

    for command in cli.get_subcommands().filter(|c| c.get_name() != "help") {
        let name = command.get_name();
        let page = format!("textfix-{}", name);
        // Synopsis and NAME read `textfix correct`, not bare `correct`
        let command = command
            .clone()
            .display_name(page.clone())
            .bin_name(format!("textfix {}", name));
        let extra: &[&str] = match name {
            "daemon" => &[FILES, SIGNALS],
            "correct" | "config" => &[FILES, ENVIRONMENT],
            _ => &[],
        };
        render(&man_dir, &page, command, extra)?;
    }

    println!("cargo:warning=textfix man pages written to {}", man_dir.display());
    Ok(())
}

/// Write `<page>.1` with the extra roff sections after clap's own
fn render(dir: &Path, page: &str, command: clap::Command, extra: &[&str]) -> Result<(), Error> {
    let mut roff = Vec::new();
    Man::new(command)
        .section("1")
        .source(SOURCE)
        .manual(MANUAL)
        .render(&mut roff)?;
    for section in extra {
        roff.write_all(section.as_bytes())?;
    }
    fs::write(dir.join(format!("{}.1", page)), roff)
}
