//! Command-line surface and error-to-exit-code mapping.

use clap::{Parser, ValueEnum};
use miette::{Diagnostic, Report};
use std::path::PathBuf;
use thiserror::Error;

/// Successful run.
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code.
pub const EXIT_CLI: i32 = 2;
/// Pipeline (network, integrity, filesystem, external tool) error exit code.
pub const EXIT_PIPELINE: i32 = 3;

/// Fetch, verify, and activate Zig toolchain releases.
#[derive(Debug, Parser)]
#[command(name = "zigfetch", version, about)]
pub struct Cli {
    /// Version to operate on: "latest", "master", or an exact version
    /// key from the release index (e.g. "0.11.0").
    #[arg(id = "zig-version", default_value = zigfetch_core::resolver::LATEST)]
    pub version: String,

    /// Directory archives are downloaded to, unpacked in, and linked
    /// from. Defaults to `~/.zigfetch`.
    #[arg(long, env = "ZIGFETCH_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Download and unpack without switching the `current` link.
    #[arg(long)]
    pub no_activate: bool,

    /// Remove the selected version's directory and archive instead of
    /// installing it.
    #[arg(short = 'r', long, visible_alias = "rm")]
    pub remove: bool,

    /// Log verbosity.
    #[arg(short, long, value_enum, default_value = "info")]
    pub level: LogLevel,
}

/// Log verbosity, lowercase on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// CLI-facing error with exit code mapping.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Bad invocation or environment (exit code 2).
    #[error("configuration error: {message}")]
    #[diagnostic(code(zigfetch::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },
    /// A pipeline stage failed (exit code 3).
    #[error("{message}")]
    #[diagnostic(code(zigfetch::cli::pipeline))]
    Pipeline {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    #[must_use]
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn pipeline_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Map core errors to CLI categories. Resolution failures are treated
/// as user input problems; everything else is a pipeline failure.
impl From<zigfetch_core::Error> for CliError {
    fn from(err: zigfetch_core::Error) -> Self {
        match err {
            zigfetch_core::Error::Resolution(message) => Self::config_with_help(
                message,
                "Run with 'latest' or an exact version key from the release index",
            ),
            zigfetch_core::Error::Integrity { .. } => Self::pipeline_with_help(
                err.to_string(),
                "The published archive did not verify; try again later or pick another version",
            ),
            zigfetch_core::Error::ExternalTool { .. } => Self::pipeline_with_help(
                err.to_string(),
                "Check that the named command is installed and on your PATH",
            ),
            zigfetch_core::Error::Parse(_)
            | zigfetch_core::Error::Filesystem { .. }
            | zigfetch_core::Error::Http(_)
            | zigfetch_core::Error::Io(_)
            | zigfetch_core::Error::Json(_) => Self::pipeline(err.to_string()),
        }
    }
}

/// Exit code for an error.
#[must_use]
pub fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Pipeline { .. } => EXIT_PIPELINE,
    }
}

/// Render an error to stderr through miette's fancy reporter.
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
}
