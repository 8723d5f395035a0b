//! Textfix - select text anywhere, press a hotkey, get it corrected in place
//!
//! Run with `textfix` or `textfix daemon` to start the daemon.
//! Use `textfix correct` from a compositor keybinding to trigger a correction.
//! Use `textfix config --init` to write the default configuration.

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use textfix::cli::{Cli, Commands};
use textfix::config::{init_config_file, load_config, Config};
use textfix::correction::Language;
use textfix::daemon::{self, Daemon};
use textfix::hotkey::shortcut::ShortcutSpec;
use textfix::orchestrator::Outcome;
use textfix::platform::Platform;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("textfix={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(ref shortcut) = cli.shortcut {
        config.hotkey.shortcut = shortcut.clone();
    }
    if let Some(ref endpoint) = cli.endpoint {
        config.service.endpoint = endpoint.clone();
    }
    if let Some(ref language) = cli.language {
        config.correction.language = Language::parse(language)
            .with_context(|| format!("Unsupported language '{}' (expected pt, en or es)", language))?;
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon =
                Daemon::new(config, cli.config.clone()).with_shortcut_override(cli.shortcut.clone());
            daemon.run().await?;
        }

        Commands::Correct { now: false } => {
            let pid = daemon::signal_running_daemon()?;
            tracing::debug!("Sent correction trigger to daemon (pid {})", pid);
        }

        Commands::Correct { now: true } => {
            correct_now(&config).await?;
        }

        Commands::Config { init: true } => {
            let (path, created) = init_config_file(cli.config.as_deref())?;
            if created {
                println!("Wrote default config to {}", path.display());
            } else {
                println!("Config already exists at {}", path.display());
            }
        }

        Commands::Config { init: false } => {
            show_config(&config, cli.config.as_deref())?;
        }

        Commands::CheckShortcut { shortcut } => {
            let spec = ShortcutSpec::parse(&shortcut)
                .with_context(|| format!("Invalid shortcut '{}'", shortcut))?;
            let platform = Platform::detect();
            println!("{}", spec);
            let native = spec.clone().normalized_for_platform(platform);
            if native != spec {
                println!("{} on {}", native, platform);
            }
        }
    }

    Ok(())
}

/// Run one correction in this process
async fn correct_now(config: &Config) -> anyhow::Result<()> {
    let orchestrator = daemon::build_orchestrator(config, Platform::detect())?;

    match orchestrator.run(None).await {
        Outcome::Corrected { chars, changes } => {
            println!("Corrected {} characters ({} changes)", chars, changes);
            Ok(())
        }
        Outcome::Failed(e) => Err(e.into()),
        other => match other.notice() {
            Some((_, message)) => anyhow::bail!(message),
            None => Ok(()),
        },
    }
}

fn show_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).or_else(Config::default_path);
    match path {
        Some(path) if path.exists() => println!("# Loaded from {}", path.display()),
        Some(path) => println!("# {} not found, showing defaults", path.display()),
        None => println!("# No config directory, showing defaults"),
    }

    let rendered =
        toml::to_string_pretty(&config.redacted()).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
