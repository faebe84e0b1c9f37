//! zigfetch CLI entry point.
//!
//! Fetches the Zig release index, resolves a version selector for the
//! detected platform, then runs the download/unpack/activate pipeline
//! (or removal) against the configured root directory.

// CLI binary talks to the terminal directly.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::Parser;
use cli::{Cli, CliError, EXIT_OK, exit_code_for, render_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zigfetch_core::manifest::fetch_index;
use zigfetch_core::pipeline::Installer;
use zigfetch_core::platform::Platform;
use zigfetch_core::resolver::resolve;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.level);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("fatal: failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = match rt.block_on(run(cli)) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr so stdout stays clean for the result summary.
/// `RUST_LOG` overrides the `--level` flag when set.
fn init_tracing(level: cli::LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let lvl = level.as_filter();
        EnvFilter::new(format!("zigfetch={lvl},zigfetch_core={lvl}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Default working directory: a dotfile directory under home.
fn default_root() -> Result<PathBuf, CliError> {
    dirs::home_dir()
        .map(|home| home.join(".zigfetch"))
        .ok_or_else(|| {
            CliError::config_with_help(
                "could not determine the home directory",
                "Pass --root or set ZIGFETCH_ROOT explicitly",
            )
        })
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let root = match cli.root {
        Some(root) => root,
        None => default_root()?,
    };

    tracing::debug!(root = %root.display(), version = %cli.version, "Starting run");
    let installer = Installer::new(root)?;
    let releases = fetch_index(installer.client()).await?;
    let platform = Platform::detect().await?;
    let archive = resolve(&releases, &cli.version, &platform)?;

    if cli.remove {
        installer.remove(archive)?;
        println!("Removed zig {} from {}", archive.version, installer.root().display());
        return Ok(());
    }

    installer.save(archive).await?;
    installer.unpack(archive).await?;

    if cli.no_activate {
        println!(
            "Installed zig {} at {} (activation skipped)",
            archive.version,
            installer.dir_path(archive).display()
        );
        return Ok(());
    }

    installer.activate(archive)?;
    installer.check_active(archive).await;
    println!(
        "zig {} is now current ({} -> {})",
        archive.version,
        installer.link_path().display(),
        archive.dir_name
    );
    Ok(())
}
