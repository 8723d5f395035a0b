//! Development tasks for textfix
//!
//! Usage:
//!   cargo xtask install [--prefix DIR]    Install binary and man pages (requires sudo)
//!   cargo xtask uninstall [--prefix DIR]  Remove them again (requires sudo)
//!   cargo xtask dist                      Collect a release binary and man pages in target/dist

use anyhow::Context;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

const DEFAULT_PREFIX: &str = "/usr/local";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let prefix = match prefix_arg(&args[1..]) {
        Ok(prefix) => prefix,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args[0].as_str() {
        "install" => install(&prefix),
        "uninstall" => uninstall(&prefix),
        "dist" => dist(),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"
textfix development tasks

Usage: cargo xtask <COMMAND> [OPTIONS]

Commands:
  install    Build release binary and install it with its man pages (requires sudo)
  uninstall  Remove the installed binary and man pages (requires sudo)
  dist       Build a release binary and collect it with man pages in target/dist

Options:
  --prefix DIR   Install prefix (default: /usr/local)

Examples:
  cargo xtask install                 # Install to /usr/local
  cargo xtask install --prefix /opt   # Install to /opt/bin and /opt/share/man
  cargo xtask dist                    # Prepare target/dist for packaging
  cargo xtask uninstall               # Remove installed files
"#
    );
}

/// `--prefix DIR` from the remaining arguments
fn prefix_arg(args: &[String]) -> anyhow::Result<PathBuf> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--prefix" {
            let dir = iter.next().context("--prefix needs a directory")?;
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = arg.strip_prefix("--prefix=") {
            return Ok(PathBuf::from(dir));
        }
    }
    Ok(PathBuf::from(DEFAULT_PREFIX))
}

/// Get the project root directory
fn project_root() -> anyhow::Result<PathBuf> {
    let dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir().context("Cannot determine current directory")?,
    };

    // xtask is in a subdirectory, go up one level
    Ok(dir.parent().unwrap_or(&dir).to_path_buf())
}

/// Release build with man pages; returns the binary path
fn build_release(root: &Path) -> anyhow::Result<PathBuf> {
    println!("==> Building release binary...");

    let status = Command::new("cargo")
        .args(["build", "--release", "-p", "textfix"])
        .env("TEXTFIX_GEN_MANPAGES", "1")
        .current_dir(root)
        .status()?;

    if !status.success() {
        anyhow::bail!("Build failed");
    }

    let binary = root.join("target/release/textfix");
    if !binary.exists() {
        anyhow::bail!("Binary not found at {:?}", binary);
    }
    Ok(binary)
}

/// Man pages written by the most recent build script run
fn find_man_pages(root: &Path) -> Vec<PathBuf> {
    let build_dir = root.join("target/release/build");
    let Ok(entries) = fs::read_dir(&build_dir) else {
        return Vec::new();
    };

    let newest = entries
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("textfix-"))
        .map(|e| e.path().join("out/man"))
        .filter(|dir| dir.is_dir())
        .max_by_key(|dir| fs::metadata(dir).and_then(|m| m.modified()).ok());

    let Some(man_dir) = newest else {
        return Vec::new();
    };

    let mut pages: Vec<PathBuf> = fs::read_dir(man_dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "1"))
                .collect()
        })
        .unwrap_or_default();
    pages.sort();
    pages
}

fn sudo_install(source: &Path, target: &Path) -> anyhow::Result<()> {
    let mode = if target.extension().is_some_and(|ext| ext == "1") {
        "-Dm644"
    } else {
        "-Dm755"
    };

    let status = Command::new("sudo")
        .arg("install")
        .arg(mode)
        .arg(source)
        .arg(target)
        .status()?;

    if !status.success() {
        anyhow::bail!("Install of {:?} failed (sudo required)", target);
    }
    Ok(())
}

/// Build release binary and install it with its man pages
fn install(prefix: &Path) -> anyhow::Result<()> {
    let root = project_root()?;
    let binary = build_release(&root)?;

    let target = prefix.join("bin/textfix");
    println!("==> Installing to {}...", target.display());
    sudo_install(&binary, &target)?;

    let man_dir = prefix.join("share/man/man1");
    for page in find_man_pages(&root) {
        if let Some(name) = page.file_name() {
            sudo_install(&page, &man_dir.join(name))?;
        }
    }

    println!("==> Installed successfully!");
    println!();
    println!("Installed: {}", target.display());

    // Show version
    let _ = Command::new(&target).arg("--version").status();

    Ok(())
}

/// Remove the binary and man pages
fn uninstall(prefix: &Path) -> anyhow::Result<()> {
    let binary = prefix.join("bin/textfix");
    println!("==> Removing {}...", binary.display());

    let pages = prefix.join("share/man/man1");
    let status = Command::new("sudo")
        .arg("sh")
        .arg("-c")
        .arg(format!(
            "rm -f '{}' '{}'/textfix.1 '{}'/textfix-*.1",
            binary.display(),
            pages.display(),
            pages.display()
        ))
        .status()?;

    if !status.success() {
        anyhow::bail!("Uninstall failed (sudo required)");
    }

    println!("==> Uninstalled successfully!");
    Ok(())
}

/// Build optimized release binary and collect it for distribution
fn dist() -> anyhow::Result<()> {
    let root = project_root()?;
    let binary = build_release(&root)?;

    let dist_dir = root.join("target/dist");
    fs::create_dir_all(dist_dir.join("man"))?;

    fs::copy(&binary, dist_dir.join("textfix")).context("Failed to copy binary")?;
    let pages = find_man_pages(&root);
    for page in &pages {
        if let Some(name) = page.file_name() {
            fs::copy(page, dist_dir.join("man").join(name))?;
        }
    }

    println!("==> Built: {:?}", dist_dir);
    println!("    binary + {} man page(s)", pages.len());

    let _ = Command::new(dist_dir.join("textfix")).arg("--version").status();

    Ok(())
}
