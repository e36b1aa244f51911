//! Cache entry model and timestamp conversions.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::scanner::{hash_to_hex, hex_to_hash, Hash};

/// One cached file: the metadata that proves the hash is still valid, plus
/// the hash itself.
///
/// An entry may be trusted (its hash reused without rereading the file) only
/// when the live file's size and mtime both exactly match; see
/// [`CacheEntry::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// File size in bytes at hash time.
    pub size: u64,
    /// Modification time at hash time, nanoseconds since the Unix epoch.
    pub mtime_ns: u64,
    /// BLAKE3 content hash, 64 lowercase hex characters.
    pub hash: String,
}

impl CacheEntry {
    /// Build an entry from a live stat and a freshly computed hash.
    #[must_use]
    pub fn new(size: u64, modified: SystemTime, hash: &Hash) -> Self {
        Self {
            size,
            mtime_ns: mtime_to_nanos(modified),
            hash: hash_to_hex(hash),
        }
    }

    /// Whether this entry is trusted for a file with the given live metadata.
    ///
    /// Both size and mtime must match exactly; any drift means the content
    /// may have changed and the caller must rehash.
    #[must_use]
    pub fn matches(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.mtime_ns == mtime_to_nanos(modified)
    }

    /// Decode the stored hex hash. `None` when the stored string is not a
    /// well-formed BLAKE3 hex digest (treated as a miss by callers).
    #[must_use]
    pub fn hash_bytes(&self) -> Option<Hash> {
        hex_to_hash(&self.hash)
    }
}

/// Convert a modification time to nanoseconds since the Unix epoch.
///
/// Pre-epoch timestamps clamp to zero; they fail the trust check once and
/// the file is rehashed.
#[must_use]
pub fn mtime_to_nanos(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Inverse of [`mtime_to_nanos`].
#[must_use]
pub fn nanos_to_mtime(ns: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_nanos(ns)
}
