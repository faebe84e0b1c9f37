//! Archive integrity verification: declared byte size plus SHA-256
//! digest against manifest metadata.

use crate::manifest::Archive;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Compute the lowercase hex SHA-256 digest of a byte buffer.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Check a byte buffer against the archive's declared size and digest.
///
/// Both checks must pass. A mismatch never aborts here; in verbose mode
/// the failing field is logged with its expected and actual values, and
/// the caller decides whether the mismatch is fatal. The download path
/// treats `false` as fatal, the cache-reuse path treats it as
/// "re-download, do not trust the local file".
#[must_use]
pub fn verify(archive: &Archive, bytes: &[u8], verbose: bool) -> bool {
    let mut ok = true;

    if bytes.len() as u64 != archive.size {
        if verbose {
            warn!(
                file = %archive.file_name,
                expected = archive.size,
                actual = bytes.len(),
                "Archive size mismatch"
            );
        }
        ok = false;
    }

    let digest = sha256_hex(bytes);
    if !digest.eq_ignore_ascii_case(&archive.shasum) {
        if verbose {
            warn!(
                file = %archive.file_name,
                expected = %archive.shasum,
                actual = %digest,
                "Archive checksum mismatch"
            );
        }
        ok = false;
    }

    ok
}
