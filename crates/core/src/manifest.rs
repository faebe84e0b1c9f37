//! Release manifest model.
//!
//! The remote index is a JSON document mapping version identifiers to
//! release entries. Each entry mixes named metadata fields (`date`,
//! `docs`, `stdDocs`, `notes`) with platform-keyed archive records:
//!
//! ```json
//! {
//!   "master": { "version": "0.12.0-dev.1+abc", "date": "...", ... },
//!   "0.11.0": {
//!     "date": "2023-08-04",
//!     "docs": "https://ziglang.org/documentation/0.11.0/",
//!     "x86_64-linux": { "tarball": "https://...", "shasum": "...", "size": "44961892" }
//!   }
//! }
//! ```
//!
//! Parsing is two-pass: serde first extracts the named metadata fields
//! into [`ReleaseMeta`], then the flattened remainder is validated as a
//! mapping from platform identifier to archive record. A remainder
//! value that is not archive-shaped is a parse error.

use crate::{Error, Result};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use tracing::debug;
use url::Url;

/// Well-known URL of the release index.
pub const INDEX_URL: &str = "https://ziglang.org/download/index.json";

/// Version key of the development (unreleased) entry.
pub const MASTER: &str = "master";

/// Metadata of a single release, immutable once parsed.
#[derive(Debug, Clone)]
pub struct ReleaseMeta {
    /// Version identifier. For the `master` entry this is the resolved
    /// development version the index declares inline.
    pub version: String,
    /// Release date.
    pub date: NaiveDate,
    /// Documentation URL.
    pub docs: Url,
    /// Standard-library documentation URL, when published.
    pub std_docs: Option<Url>,
    /// Release-notes URL, when published.
    pub notes: Option<Url>,
}

/// How an archive is unpacked, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    /// Any `.tar*` archive, handed to `tar xf`.
    Tar,
    /// A `.zip` archive, handed to `unzip -o`.
    Zip,
}

impl ExtractKind {
    /// Program to invoke for this archive kind.
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Zip => "unzip",
        }
    }

    /// Arguments for [`Self::program`], extracting `file_name` into the
    /// process's working directory.
    #[must_use]
    pub fn args(self, file_name: &str) -> Vec<String> {
        match self {
            Self::Tar => vec!["xf".to_string(), file_name.to_string()],
            Self::Zip => vec!["-o".to_string(), file_name.to_string()],
        }
    }

    /// Full command line, for logs and error messages.
    #[must_use]
    pub fn command_line(self, file_name: &str) -> String {
        format!("{} {}", self.program(), self.args(file_name).join(" "))
    }
}

/// One platform-specific downloadable release asset plus its expected
/// size/checksum and derived local names.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Version this archive belongs to.
    pub version: String,
    /// Platform identifier, e.g. `"x86_64-linux"`.
    pub platform: String,
    /// Declared byte size.
    pub size: u64,
    /// Declared SHA-256 digest, hex.
    pub shasum: String,
    /// Source URL.
    pub tarball: Url,
    /// Local file name, the last segment of the tarball URL path.
    pub file_name: String,
    /// Extraction directory name, the file name without its archive
    /// extension. Always a prefix of `file_name`.
    pub dir_name: String,
    /// Derived extraction command kind.
    pub extract: ExtractKind,
}

impl Archive {
    fn from_raw(version: &str, platform: &str, raw: RawArchive) -> Result<Self> {
        let file_name = raw
            .tarball
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| {
                Error::parse(format!("archive URL has no file name: {}", raw.tarball))
            })?
            .to_string();
        let (dir_name, extract) = split_archive_name(&file_name)?;

        Ok(Self {
            version: version.to_string(),
            platform: platform.to_string(),
            size: raw.size,
            shasum: raw.shasum,
            tarball: raw.tarball,
            file_name,
            dir_name,
            extract,
        })
    }
}

/// Split an archive file name into its extraction directory name and
/// extractor kind. `.tar*` names are cut at the last `.tar` occurrence
/// (so `foo.tar.xz` extracts to `foo`); `.zip` names lose the
/// extension. Anything else is a parse error.
fn split_archive_name(file_name: &str) -> Result<(String, ExtractKind)> {
    if let Some(idx) = file_name.rfind(".tar") {
        Ok((file_name[..idx].to_string(), ExtractKind::Tar))
    } else if let Some(stem) = file_name.strip_suffix(".zip") {
        Ok((stem.to_string(), ExtractKind::Zip))
    } else {
        Err(Error::parse(format!(
            "unrecognized archive extension: {file_name}"
        )))
    }
}

/// A version's metadata plus its per-platform archive set.
#[derive(Debug, Clone)]
pub struct Release {
    /// Release metadata.
    pub meta: ReleaseMeta,
    /// Archives keyed by platform identifier, in document order.
    pub platforms: IndexMap<String, Archive>,
}

/// All published releases plus the `master` sentinel, keyed by version
/// identifier in release-index document order.
#[derive(Debug, Clone, Default)]
pub struct Releases(IndexMap<String, Release>);

impl Releases {
    /// Parse a raw release-index document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the JSON is malformed, a date or URL
    /// field does not parse, a platform record is not archive-shaped,
    /// or an archive file extension is unrecognized.
    pub fn parse(raw_json: &str) -> Result<Self> {
        let raw: IndexMap<String, RawRelease> = serde_json::from_str(raw_json)
            .map_err(|e| Error::parse(format!("malformed release index: {e}")))?;

        let mut releases = IndexMap::with_capacity(raw.len());
        for (key, entry) in raw {
            // The development entry names its resolved version inline;
            // published entries are identified by their map key.
            let version = entry.version.unwrap_or_else(|| key.clone());
            let mut platforms = IndexMap::with_capacity(entry.platforms.len());
            for (platform, raw_archive) in entry.platforms {
                let archive = Archive::from_raw(&version, &platform, raw_archive)?;
                platforms.insert(platform, archive);
            }
            releases.insert(
                key,
                Release {
                    meta: ReleaseMeta {
                        version,
                        date: entry.date,
                        docs: entry.docs,
                        std_docs: entry.std_docs,
                        notes: entry.notes,
                    },
                    platforms,
                },
            );
        }

        debug!(count = releases.len(), "Parsed release index");
        Ok(Self(releases))
    }

    /// Look up a release by its version key.
    #[must_use]
    pub fn get(&self, version: &str) -> Option<&Release> {
        self.0.get(version)
    }

    /// Iterate releases in release-index document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Release)> {
        self.0.iter().map(|(key, release)| (key.as_str(), release))
    }

    /// Number of releases, the `master` sentinel included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fetch and parse the release index from [`INDEX_URL`].
///
/// # Errors
///
/// Returns [`Error::Http`] on transport failure and [`Error::Parse`] on
/// a non-success status or a malformed document.
pub async fn fetch_index(client: &reqwest::Client) -> Result<Releases> {
    debug!(url = INDEX_URL, "Fetching release index");
    let response = client.get(INDEX_URL).send().await?;
    if !response.status().is_success() {
        return Err(Error::parse(format!(
            "release index fetch failed (HTTP {})",
            response.status()
        )));
    }
    let body = response.text().await?;
    Releases::parse(&body)
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    date: NaiveDate,
    docs: Url,
    #[serde(rename = "stdDocs")]
    std_docs: Option<Url>,
    notes: Option<Url>,
    version: Option<String>,
    #[serde(flatten)]
    platforms: IndexMap<String, RawArchive>,
}

#[derive(Debug, Deserialize)]
struct RawArchive {
    tarball: Url,
    shasum: String,
    #[serde(deserialize_with = "de_size")]
    size: u64,
}

/// The live index declares sizes as decimal strings; accept a plain
/// JSON number as well.
fn de_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeRepr {
        Num(u64),
        Text(String),
    }

    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Num(n) => Ok(n),
        SizeRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_INDEX: &str = r#"{
        "master": {
            "version": "0.12.0-dev.1+abcdef123",
            "date": "2023-09-01",
            "docs": "https://ziglang.org/documentation/master/",
            "stdDocs": "https://ziglang.org/documentation/master/std/",
            "x86_64-linux": {
                "tarball": "https://ziglang.org/builds/zig-linux-x86_64-0.12.0-dev.1+abcdef123.tar.xz",
                "shasum": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "size": "44000000"
            }
        },
        "0.11.0": {
            "date": "2023-08-04",
            "docs": "https://ziglang.org/documentation/0.11.0/",
            "stdDocs": "https://ziglang.org/documentation/0.11.0/std/",
            "notes": "https://ziglang.org/download/0.11.0/release-notes.html",
            "x86_64-linux": {
                "tarball": "https://ziglang.org/download/0.11.0/zig-linux-x86_64-0.11.0.tar.xz",
                "shasum": "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                "size": "44961892"
            },
            "x86_64-windows": {
                "tarball": "https://ziglang.org/download/0.11.0/zig-windows-x86_64-0.11.0.zip",
                "shasum": "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc",
                "size": 81576961
            }
        },
        "0.10.0": {
            "date": "2022-11-01",
            "docs": "https://ziglang.org/documentation/0.10.0/",
            "notes": "https://ziglang.org/download/0.10.0/release-notes.html",
            "x86_64-linux": {
                "tarball": "https://ziglang.org/download/0.10.0/zig-linux-x86_64-0.10.0.tar.xz",
                "shasum": "dddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd",
                "size": "44085596"
            }
        }
    }"#;

    #[test]
    fn test_parse_preserves_document_order() {
        let releases = Releases::parse(SAMPLE_INDEX).unwrap();
        let keys: Vec<&str> = releases.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["master", "0.11.0", "0.10.0"]);
    }

    #[test]
    fn test_metadata_does_not_leak_into_platforms() {
        let releases = Releases::parse(SAMPLE_INDEX).unwrap();
        let release = releases.get("0.11.0").unwrap();
        assert_eq!(release.platforms.len(), 2);
        for key in ["date", "docs", "stdDocs", "notes", "version"] {
            assert!(!release.platforms.contains_key(key));
        }
    }

    #[test]
    fn test_release_meta_fields() {
        let releases = Releases::parse(SAMPLE_INDEX).unwrap();
        let meta = &releases.get("0.11.0").unwrap().meta;
        assert_eq!(meta.version, "0.11.0");
        assert_eq!(meta.date.to_string(), "2023-08-04");
        assert!(meta.docs.as_str().contains("0.11.0"));
        assert!(meta.std_docs.is_some());
        assert!(meta.notes.is_some());
    }

    #[test]
    fn test_master_version_comes_from_inline_field() {
        let releases = Releases::parse(SAMPLE_INDEX).unwrap();
        let master = releases.get(MASTER).unwrap();
        assert_eq!(master.meta.version, "0.12.0-dev.1+abcdef123");
        let archive = &master.platforms["x86_64-linux"];
        assert_eq!(archive.version, "0.12.0-dev.1+abcdef123");
    }

    #[test]
    fn test_archive_derivations_tar() {
        let releases = Releases::parse(SAMPLE_INDEX).unwrap();
        let archive = &releases.get("0.11.0").unwrap().platforms["x86_64-linux"];
        assert_eq!(archive.file_name, "zig-linux-x86_64-0.11.0.tar.xz");
        assert_eq!(archive.dir_name, "zig-linux-x86_64-0.11.0");
        assert_eq!(archive.extract, ExtractKind::Tar);
        assert_eq!(archive.size, 44_961_892);
        assert_eq!(
            archive.extract.command_line(&archive.file_name),
            "tar xf zig-linux-x86_64-0.11.0.tar.xz"
        );
    }

    #[test]
    fn test_archive_derivations_zip() {
        let releases = Releases::parse(SAMPLE_INDEX).unwrap();
        let archive = &releases.get("0.11.0").unwrap().platforms["x86_64-windows"];
        assert_eq!(archive.file_name, "zig-windows-x86_64-0.11.0.zip");
        assert_eq!(archive.dir_name, "zig-windows-x86_64-0.11.0");
        assert_eq!(archive.extract, ExtractKind::Zip);
        // Numeric size form is accepted too.
        assert_eq!(archive.size, 81_576_961);
        assert_eq!(
            archive.extract.command_line(&archive.file_name),
            "unzip -o zig-windows-x86_64-0.11.0.zip"
        );
    }

    #[test]
    fn test_dir_name_is_extension_free_prefix_of_file_name() {
        let releases = Releases::parse(SAMPLE_INDEX).unwrap();
        for (_, release) in releases.iter() {
            for archive in release.platforms.values() {
                assert!(archive.file_name.starts_with(&archive.dir_name));
                assert!(!archive.dir_name.contains(".tar"));
                assert!(!archive.dir_name.contains(".zip"));
            }
        }
    }

    #[test]
    fn test_split_archive_name_cuts_at_last_tar_occurrence() {
        let (dir, kind) = split_archive_name("zig-0.11.0.tar.tar.gz").unwrap();
        assert_eq!(dir, "zig-0.11.0.tar");
        assert_eq!(kind, ExtractKind::Tar);

        let (dir, kind) = split_archive_name("zig-0.11.0.tar").unwrap();
        assert_eq!(dir, "zig-0.11.0");
        assert_eq!(kind, ExtractKind::Tar);
    }

    #[test]
    fn test_unrecognized_extension_is_parse_error() {
        let err = split_archive_name("zig-0.11.0.7z").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let raw = SAMPLE_INDEX.replace("zig-linux-x86_64-0.10.0.tar.xz", "zig-0.10.0.7z");
        assert!(matches!(Releases::parse(&raw), Err(Error::Parse(_))));
    }

    #[test]
    fn test_malformed_date_is_parse_error() {
        let raw = SAMPLE_INDEX.replace("2023-08-04", "yesterday");
        assert!(matches!(Releases::parse(&raw), Err(Error::Parse(_))));
    }

    #[test]
    fn test_malformed_url_is_parse_error() {
        let raw = SAMPLE_INDEX.replace("https://ziglang.org/documentation/0.10.0/", "not a url");
        assert!(matches!(Releases::parse(&raw), Err(Error::Parse(_))));
    }

    #[test]
    fn test_non_archive_shaped_platform_record_is_parse_error() {
        let raw = r#"{
            "0.11.0": {
                "date": "2023-08-04",
                "docs": "https://ziglang.org/documentation/0.11.0/",
                "x86_64-linux": { "note": "no tarball here" }
            }
        }"#;
        assert!(matches!(Releases::parse(raw), Err(Error::Parse(_))));
    }

    #[test]
    fn test_malformed_size_string_is_parse_error() {
        let raw = SAMPLE_INDEX.replace("\"44961892\"", "\"lots\"");
        assert!(matches!(Releases::parse(&raw), Err(Error::Parse(_))));
    }

    #[test]
    fn test_archive_url_without_file_name_is_parse_error() {
        let raw = SAMPLE_INDEX.replace(
            "https://ziglang.org/download/0.10.0/zig-linux-x86_64-0.10.0.tar.xz",
            "https://ziglang.org/",
        );
        assert!(matches!(Releases::parse(&raw), Err(Error::Parse(_))));
    }
}
