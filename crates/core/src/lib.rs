//! Core library for zigfetch.
//!
//! Covers the full install pipeline for Zig toolchain releases:
//!
//! - [`manifest`] - parse the remote release index into typed records
//! - [`platform`] - detect the running machine's arch/OS pair
//! - [`resolver`] - match a version selector and platform to an archive
//! - [`verify`] - size and SHA-256 checks against manifest metadata
//! - [`pipeline`] - download, unpack, activate, and remove archives

pub mod manifest;
pub mod pipeline;
pub mod platform;
pub mod resolver;
pub mod verify;

use std::path::Path;
use thiserror::Error;

/// Main error type for zigfetch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed release index: bad JSON, bad date/URL fields, or an
    /// archive whose file extension is unrecognized.
    #[error("Manifest parse error: {0}")]
    Parse(String),

    /// Unknown version selector, or the release does not offer an
    /// archive for the requested platform.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Downloaded bytes fail the size/digest check. Fatal; there is no
    /// retry anywhere in the pipeline.
    #[error("Integrity check failed for {file}: {message}")]
    Integrity {
        /// The archive file name.
        file: String,
        /// What mismatched.
        message: String,
    },

    /// An external collaborator process (archiver, toolchain
    /// introspection) failed for a reason other than "not installed".
    #[error("External tool `{command}` failed: {message}")]
    ExternalTool {
        /// The invoked command line.
        command: String,
        /// Failure detail.
        message: String,
    },

    /// Failed symlink/rename, or a missing path on removal.
    #[error("Filesystem error at {}: {message}", path.display())]
    Filesystem {
        /// The path being operated on.
        path: Box<Path>,
        /// Failure detail.
        message: String,
    },

    /// HTTP transport error while fetching the index or an archive.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error outside manifest parsing (e.g. tool introspection output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a manifest parse error.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a resolution error.
    #[must_use]
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create an integrity error.
    #[must_use]
    pub fn integrity(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Integrity {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create an external tool error.
    #[must_use]
    pub fn external_tool(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a filesystem error.
    #[must_use]
    pub fn filesystem(path: &Path, message: impl Into<String>) -> Self {
        Self::Filesystem {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for zigfetch operations
pub type Result<T> = std::result::Result<T, Error>;
