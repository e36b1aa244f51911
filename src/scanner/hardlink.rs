//! Hardlink detection during the walk.
//!
//! Two directory entries backed by the same inode are the same bytes on
//! disk, not a duplicate worth acting on. The tracker remembers every
//! `(device, inode)` pair seen across all configured directories and flags
//! repeat sightings so only the first path enters the candidate set. Links
//! created by a previous `hardlink` run therefore collapse back onto their
//! kept file on the next scan instead of being reported again.
//!
//! On platforms without stable inode metadata (Windows in particular) the
//! tracker is inert and every entry passes through.

use std::collections::HashSet;
use std::fs::Metadata;

/// Platform inode identity: `(device, inode)` on Unix, unavailable elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InodeKey {
    dev: u64,
    ino: u64,
}

impl InodeKey {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Tracks inodes seen so far in a scan.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: HashSet<InodeKey>,
}

impl HardlinkTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `metadata` refers to an inode that has already
    /// been seen during this scan, recording it otherwise.
    pub fn is_hardlink(&mut self, metadata: &Metadata) -> bool {
        match InodeKey::from_metadata(metadata) {
            Some(key) => !self.seen.insert(key),
            None => false,
        }
    }

    /// Number of distinct inodes recorded.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
