//! Platform detection.
//!
//! Prefers asking the installed toolchain what it was built for
//! (`zig targets` reports the native target as JSON); falls back to the
//! host-reported architecture and OS when the toolchain is not
//! installed. A missing toolchain is expected on first install and is
//! never an error; any other introspection failure propagates.

use crate::{Error, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use tokio::process::Command;
use tracing::debug;

/// Architecture + OS identifier pair, used to key into a release's
/// platform mapping (e.g. `"x86_64-linux"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// CPU architecture, Zig naming (e.g. `x86_64`, `aarch64`).
    pub arch: String,
    /// Operating system, Zig naming (e.g. `linux`, `macos`, `windows`).
    pub os: String,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(arch: impl Into<String>, os: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            os: os.into(),
        }
    }

    /// The host-reported platform. Rust and Zig agree on the naming of
    /// every platform the release index publishes archives for.
    #[must_use]
    pub fn host() -> Self {
        Self::new(std::env::consts::ARCH, std::env::consts::OS)
    }

    /// Detect the running machine's platform.
    ///
    /// Primary path: invoke `zig targets` and read `native.cpu.arch`
    /// and `native.os` from its JSON output. If the binary is not
    /// installed, fall back to [`Platform::host`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] if `zig targets` exits non-zero
    /// or emits output that does not parse; returns [`Error::Io`] for
    /// spawn failures other than "not found".
    pub async fn detect() -> Result<Self> {
        let output = match Command::new("zig").arg("targets").output().await {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let host = Self::host();
                debug!(platform = %host, "zig not installed, using host platform");
                return Ok(host);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        if !output.status.success() {
            return Err(Error::external_tool(
                "zig targets",
                format!("exit status {}", output.status),
            ));
        }

        let targets: Targets = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::external_tool("zig targets", format!("malformed output: {e}")))?;
        let platform = Self::new(targets.native.cpu.arch, targets.native.os);
        debug!(%platform, "Detected native platform");
        Ok(platform)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.arch, self.os)
    }
}

#[derive(Debug, Deserialize)]
struct Targets {
    native: Native,
}

#[derive(Debug, Deserialize)]
struct Native {
    cpu: Cpu,
    os: String,
}

#[derive(Debug, Deserialize)]
struct Cpu {
    arch: String,
}
