//! BLAKE3 content hashing.
//!
//! Every candidate file is hashed in full; two files are considered
//! duplicates only when their 32-byte digests are equal. Small files are
//! hashed through a buffered reader. Files at or above the configured
//! large-file threshold are memory-mapped and hashed with BLAKE3's internal
//! rayon parallelism, which is substantially faster on multi-core machines.

use std::fs::File;
use std::io;
use std::path::Path;

use super::HashError;

/// A 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Hashes file contents, choosing a read strategy by file size.
#[derive(Debug, Clone)]
pub struct FileHasher {
    large_file_threshold: u64,
}

impl FileHasher {
    /// Create a hasher that memory-maps files of `large_file_threshold`
    /// bytes or more.
    #[must_use]
    pub fn new(large_file_threshold: u64) -> Self {
        Self {
            large_file_threshold,
        }
    }

    /// Hash the full contents of the file at `path`.
    ///
    /// `size` is the stat size observed during the walk; it only selects the
    /// read strategy, the digest always covers whatever is on disk at read
    /// time.
    pub fn hash_file(&self, path: &Path, size: u64) -> Result<Hash, HashError> {
        let mut hasher = blake3::Hasher::new();
        if size >= self.large_file_threshold {
            hasher
                .update_mmap_rayon(path)
                .map_err(|source| hash_error(path, source))?;
        } else {
            let file = File::open(path).map_err(|source| hash_error(path, source))?;
            hasher
                .update_reader(file)
                .map_err(|source| hash_error(path, source))?;
        }
        Ok(*hasher.finalize().as_bytes())
    }
}

fn hash_error(path: &Path, source: io::Error) -> HashError {
    match source.kind() {
        io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
        _ => HashError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Convert a hash to its lowercase hex representation.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from_bytes(*hash).to_hex().to_string()
}

/// Parse a hex string back into a hash.
///
/// Returns `None` for strings that are not exactly 64 hex digits.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    // ==================== Hashing Tests ====================

    #[test]
    fn test_identical_content_same_hash() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", b"same bytes");
        let b = write_file(&dir, "b.bin", b"same bytes");

        let hasher = FileHasher::new(64 * 1024 * 1024);
        let ha = hasher.hash_file(&a, 10).unwrap();
        let hb = hasher.hash_file(&b, 10).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_different_content_different_hash() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", b"first");
        let b = write_file(&dir, "b.bin", b"second");

        let hasher = FileHasher::new(64 * 1024 * 1024);
        assert_ne!(
            hasher.hash_file(&a, 5).unwrap(),
            hasher.hash_file(&b, 6).unwrap()
        );
    }

    #[test]
    fn test_mmap_path_matches_streaming_path() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.bin", &vec![0xabu8; 8192]);

        let streamed = FileHasher::new(u64::MAX).hash_file(&path, 8192).unwrap();
        let mapped = FileHasher::new(1).hash_file(&path, 8192).unwrap();
        assert_eq!(streamed, mapped);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let hasher = FileHasher::new(64 * 1024 * 1024);
        let err = hasher
            .hash_file(&dir.path().join("gone.bin"), 1)
            .unwrap_err();
        assert!(matches!(err, HashError::NotFound(_)));
    }

    #[test]
    fn test_hash_matches_blake3_reference() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "ref.bin", b"reference input");

        let hasher = FileHasher::new(64 * 1024 * 1024);
        let got = hasher.hash_file(&path, 15).unwrap();
        assert_eq!(got, *blake3::hash(b"reference input").as_bytes());
    }

    // ==================== Hex Conversion Tests ====================

    #[test]
    fn test_hex_round_trip() {
        let hash = *blake3::hash(b"round trip").as_bytes();
        let hex = hash_to_hex(&hash);
        assert_eq!(hex.len(), 64);
        assert_eq!(hex_to_hash(&hex), Some(hash));
    }

    #[test]
    fn test_hex_rejects_malformed_input() {
        assert_eq!(hex_to_hash(""), None);
        assert_eq!(hex_to_hash("abc"), None);
        assert_eq!(hex_to_hash(&"zz".repeat(32)), None);
    }
}
