//! Archive pipeline: download, unpack, activate, remove.
//!
//! Every stage is idempotent and checks on-disk state before doing
//! work: an archive that is already downloaded and verifies clean is
//! not fetched again, an existing extraction directory is not
//! re-extracted, and re-activating the current version is a no-op in
//! effect. The target directory is carried explicitly through every
//! operation; nothing mutates the process working directory.

use crate::manifest::Archive;
use crate::verify::verify;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Name of the symlink pointing at the active version's directory.
pub const CURRENT_LINK: &str = "current";

/// Temporary symlink name used for the atomic `current` swap.
const CURRENT_TMP: &str = ".current.tmp";

/// Drives the download/unpack/activate/remove stages against one
/// working directory.
pub struct Installer {
    root: PathBuf,
    client: reqwest::Client,
}

impl Installer {
    /// Create an installer rooted at `root`. The directory is created
    /// lazily by the save stage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("zigfetch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            root: root.into(),
            client,
        })
    }

    /// The working directory all stages operate in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared HTTP client, also used for the release-index fetch.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Local path of the archive file.
    #[must_use]
    pub fn file_path(&self, archive: &Archive) -> PathBuf {
        self.root.join(&archive.file_name)
    }

    /// Local path of the extraction directory.
    #[must_use]
    pub fn dir_path(&self, archive: &Archive) -> PathBuf {
        self.root.join(&archive.dir_name)
    }

    /// Local path of the `current` symlink.
    #[must_use]
    pub fn link_path(&self) -> PathBuf {
        self.root.join(CURRENT_LINK)
    }

    /// Download the archive unless a verified copy is already on disk.
    ///
    /// An existing file that fails verification is not trusted and is
    /// re-downloaded. Downloaded bytes that fail verification are fatal;
    /// no retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure and
    /// [`Error::Integrity`] if the downloaded bytes do not match the
    /// declared size/shasum.
    pub async fn save(&self, archive: &Archive) -> Result<()> {
        let file_path = self.file_path(archive);
        if file_path.is_file() {
            let existing = tokio::fs::read(&file_path).await?;
            if verify(archive, &existing, true) {
                info!(file = %file_path.display(), "Archive already downloaded");
                return Ok(());
            }
            warn!(
                file = %file_path.display(),
                "Existing archive failed verification, re-downloading"
            );
        }

        info!(url = %archive.tarball, "Downloading archive");
        let bytes = self
            .client
            .get(archive.tarball.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        if !verify(archive, &bytes, true) {
            return Err(Error::integrity(
                &archive.file_name,
                "downloaded bytes do not match the declared size/shasum",
            ));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&file_path, &bytes).await?;
        info!(file = %file_path.display(), size = bytes.len(), "Saved archive");
        Ok(())
    }

    /// Extract the archive unless its directory already exists.
    ///
    /// Extraction shells out to the derived command (`tar xf` or
    /// `unzip -o`) with the installer root as working directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] naming the failed command if the
    /// archiver cannot be spawned or exits non-zero.
    pub async fn unpack(&self, archive: &Archive) -> Result<()> {
        let dir_path = self.dir_path(archive);
        if dir_path.is_dir() {
            info!(dir = %dir_path.display(), "Archive already unpacked");
            return Ok(());
        }

        let command_line = archive.extract.command_line(&archive.file_name);
        debug!(command = %command_line, "Extracting archive");
        let status = Command::new(archive.extract.program())
            .args(archive.extract.args(&archive.file_name))
            .current_dir(&self.root)
            .status()
            .await
            .map_err(|e| Error::external_tool(&command_line, e.to_string()))?;

        if !status.success() {
            return Err(Error::external_tool(
                &command_line,
                format!("exit status {status}"),
            ));
        }

        info!(dir = %dir_path.display(), "Unpacked archive");
        Ok(())
    }

    /// Point the `current` symlink at the archive's directory.
    ///
    /// The swap is atomic: the link is created under a temporary name
    /// and renamed over `current`, so the link is never absent or
    /// half-written. Re-activating the already-current version logs and
    /// still performs the replace, which makes the operation idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the symlink or rename fails.
    pub fn activate(&self, archive: &Archive) -> Result<()> {
        let link = self.link_path();
        if let Ok(target) = std::fs::read_link(&link) {
            if target == Path::new(&archive.dir_name) {
                info!(version = %archive.version, "Current link already set");
            }
        }

        let tmp = self.root.join(CURRENT_TMP);
        if tmp.symlink_metadata().is_ok() {
            std::fs::remove_file(&tmp).map_err(|e| Error::filesystem(&tmp, e.to_string()))?;
        }
        std::os::unix::fs::symlink(&archive.dir_name, &tmp)
            .map_err(|e| Error::filesystem(&tmp, e.to_string()))?;
        std::fs::rename(&tmp, &link).map_err(|e| Error::filesystem(&link, e.to_string()))?;

        info!(link = %link.display(), target = %archive.dir_name, "Activated version");
        Ok(())
    }

    /// Post-activation sanity check: ask `zig env` where the active
    /// binary lives and log guidance if it is not the newly linked
    /// toolchain. A missing or uncooperative `zig` is tolerated; this
    /// never fails the run.
    pub async fn check_active(&self, archive: &Archive) {
        let output = match Command::new("zig").arg("env").output().await {
            Ok(output) if output.status.success() => output,
            Ok(_) | Err(_) => {
                debug!("zig env unavailable, skipping PATH check");
                return;
            }
        };

        let Ok(env) = serde_json::from_slice::<ZigEnv>(&output.stdout) else {
            debug!("zig env output did not parse, skipping PATH check");
            return;
        };

        let dir_path = self.dir_path(archive);
        let expected = std::fs::canonicalize(&dir_path).unwrap_or(dir_path);
        let exe = Path::new(&env.zig_exe);
        let active = std::fs::canonicalize(exe).unwrap_or_else(|_| exe.to_path_buf());
        if active.starts_with(&expected) {
            debug!(exe = %active.display(), "Active zig matches the linked toolchain");
        } else {
            warn!(
                active = %active.display(),
                link = %self.link_path().display(),
                "Active zig is not the newly linked toolchain; put the link directory on your PATH"
            );
        }
    }

    /// Delete the archive's extraction directory and file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if either path is missing or
    /// cannot be deleted; there is no "already removed" tolerance.
    pub fn remove(&self, archive: &Archive) -> Result<()> {
        let dir_path = self.dir_path(archive);
        std::fs::remove_dir_all(&dir_path)
            .map_err(|e| Error::filesystem(&dir_path, e.to_string()))?;
        let file_path = self.file_path(archive);
        std::fs::remove_file(&file_path)
            .map_err(|e| Error::filesystem(&file_path, e.to_string()))?;
        info!(version = %archive.version, dir = %dir_path.display(), "Removed installed version");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ZigEnv {
    zig_exe: String,
}
