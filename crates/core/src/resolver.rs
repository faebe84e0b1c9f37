//! Version and platform resolution against a parsed release index.

use crate::manifest::{Archive, MASTER, Releases};
use crate::platform::Platform;
use crate::{Error, Result};
use tracing::debug;

/// Selector token for the newest published (non-development) release.
pub const LATEST: &str = "latest";

/// Locate the archive for a version selector and platform.
///
/// The literal token [`LATEST`] selects the first release in index
/// document order whose version key is not the [`MASTER`] sentinel.
/// Any other token is looked up directly as a version key; there is no
/// fuzzy matching and no semantic-version comparison.
///
/// # Errors
///
/// Returns [`Error::Resolution`] if the selector matches no release or
/// the release offers no archive for the platform.
pub fn resolve<'a>(
    releases: &'a Releases,
    selector: &str,
    platform: &Platform,
) -> Result<&'a Archive> {
    let (version, release) = if selector == LATEST {
        releases
            .iter()
            .find(|(key, _)| *key != MASTER)
            .ok_or_else(|| Error::resolution("release index contains no published versions"))?
    } else {
        releases
            .iter()
            .find(|(key, _)| *key == selector)
            .ok_or_else(|| Error::resolution(format!("unknown version: {selector}")))?
    };

    let platform_key = platform.to_string();
    let archive = release.platforms.get(&platform_key).ok_or_else(|| {
        let available: Vec<&str> = release.platforms.keys().map(String::as_str).collect();
        Error::resolution(format!(
            "version {version} offers no archive for platform {platform_key} \
             (available: {})",
            available.join(", ")
        ))
    })?;

    debug!(%version, platform = %platform_key, file = %archive.file_name, "Resolved archive");
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::tests::SAMPLE_INDEX;

    fn sample() -> Releases {
        Releases::parse(SAMPLE_INDEX).unwrap()
    }

    #[test]
    fn test_latest_skips_master() {
        // Document order is master, 0.11.0, 0.10.0.
        let releases = sample();
        let platform = Platform::new("x86_64", "linux");
        let archive = resolve(&releases, LATEST, &platform).unwrap();
        assert_eq!(archive.version, "0.11.0");
    }

    #[test]
    fn test_explicit_version_lookup() {
        let releases = sample();
        let platform = Platform::new("x86_64", "linux");
        let archive = resolve(&releases, "0.10.0", &platform).unwrap();
        assert_eq!(archive.version, "0.10.0");
        assert_eq!(archive.file_name, "zig-linux-x86_64-0.10.0.tar.xz");
    }

    #[test]
    fn test_master_selects_development_entry() {
        let releases = sample();
        let platform = Platform::new("x86_64", "linux");
        let archive = resolve(&releases, "master", &platform).unwrap();
        assert_eq!(archive.version, "0.12.0-dev.1+abcdef123");
    }

    #[test]
    fn test_unknown_version_is_resolution_error() {
        let releases = sample();
        let platform = Platform::new("x86_64", "linux");
        let err = resolve(&releases, "9.9.9", &platform).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
        assert!(err.to_string().contains("9.9.9"));
    }

    #[test]
    fn test_missing_platform_is_resolution_error() {
        let releases = sample();
        let platform = Platform::new("riscv64", "linux");
        let err = resolve(&releases, "0.11.0", &platform).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
        // Names the searched platform and lists what the release offers.
        assert!(err.to_string().contains("riscv64-linux"));
        assert!(err.to_string().contains("x86_64-linux"));
    }

    #[test]
    fn test_no_exact_match_for_partial_version() {
        let releases = sample();
        let platform = Platform::new("x86_64", "linux");
        assert!(resolve(&releases, "0.11", &platform).is_err());
    }

    #[test]
    fn test_latest_on_empty_index_is_resolution_error() {
        let releases = Releases::parse("{}").unwrap();
        let platform = Platform::new("x86_64", "linux");
        assert!(matches!(
            resolve(&releases, LATEST, &platform),
            Err(Error::Resolution(_))
        ));
    }
}
