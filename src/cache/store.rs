//! Sharded persistent hash cache.
//!
//! The cache maps normalized absolute paths to `(size, mtime, hash)` so that
//! unchanged files are never reread on later runs. In memory it is split
//! across a fixed number of shards, each behind its own `RwLock`, so lookups
//! for distinct paths do not contend. On disk it is a single JSON snapshot
//! wrapped in a SHA-256 checksum envelope and replaced atomically
//! (write-temp, fsync, rename).
//!
//! Failure policy: a snapshot that is missing, unreadable, corrupt, checksum-
//! mismatched, or from another format version degrades to an empty cache with
//! a warning. A snapshot *location* that cannot hold a file is fatal at open
//! time, before any scanning starts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::cache::entry::{mtime_to_nanos, CacheEntry};
use crate::scanner::{path_key, Hash};

/// Snapshot format version; any other version is discarded on load.
const CACHE_VERSION: u32 = 1;

const SHARD_COUNT: usize = 16;

/// Errors raised by cache persistence.
///
/// Content-level problems never surface here; they degrade to an empty cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The snapshot path points at a directory.
    #[error("cache path {path:?} is a directory")]
    LocationIsDirectory { path: PathBuf },

    /// The snapshot's parent directory cannot be created.
    #[error("cache location {path:?} is unusable: {source}")]
    Location {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or renaming the snapshot failed.
    #[error("failed to write cache snapshot {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot serialization failed.
    #[error("failed to serialize cache snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Envelope for snapshot files so tampering or truncation is detected.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    /// SHA-256 of the compact-serialized snapshot payload.
    checksum: String,
    cache: CacheSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    version: u32,
    /// BTreeMap keeps snapshot output stable across runs.
    entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Default)]
struct Shard {
    entries: HashMap<String, CacheEntry>,
    /// Keys observed live during this run; everything else is prunable.
    live: HashSet<String>,
}

/// In-memory hash cache handle, shared across scanner and executor.
#[derive(Debug)]
pub struct HashCache {
    shards: Vec<RwLock<Shard>>,
}

impl Default for HashCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HashCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::default()).collect(),
        }
    }

    /// Open the cache at `path`.
    ///
    /// Verifies the location can hold the end-of-run snapshot (the path is
    /// not a directory; missing parents are created), then loads any existing
    /// snapshot. Unusable snapshot content logs a warning and starts empty.
    ///
    /// # Errors
    ///
    /// Only location problems: the final persist would be guaranteed to fail,
    /// so the run aborts before scanning anything.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if path.is_dir() {
            return Err(CacheError::LocationIsDirectory {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CacheError::Location {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }
        if !path.exists() {
            log::debug!("no cache snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        match Self::read_snapshot(path) {
            Ok(cache) => {
                log::debug!(
                    "cache: loaded {} entries from {}",
                    cache.len(),
                    path.display()
                );
                Ok(cache)
            }
            Err(reason) => {
                log::warn!(
                    "ignoring cache snapshot {}: {reason}; starting empty",
                    path.display()
                );
                Ok(Self::new())
            }
        }
    }

    fn read_snapshot(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let envelope: CacheEnvelope =
            serde_json::from_str(&content).map_err(|e| format!("not a valid snapshot: {e}"))?;

        // Checksum over the same compact serialization persist() hashed.
        let payload =
            serde_json::to_string(&envelope.cache).map_err(|e| format!("re-serialize: {e}"))?;
        if sha256_hex(payload.as_bytes()) != envelope.checksum {
            return Err("checksum mismatch".to_string());
        }
        if envelope.cache.version != CACHE_VERSION {
            return Err(format!(
                "snapshot version {} (expected {CACHE_VERSION})",
                envelope.cache.version
            ));
        }

        let cache = Self::new();
        for (key, entry) in envelope.cache.entries {
            let idx = shard_index(&key);
            let mut shard = cache.shards[idx]
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            shard.entries.insert(key, entry);
        }
        Ok(cache)
    }

    /// Trusted hash lookup: returns the cached hash only when the live
    /// `(size, mtime)` exactly matches the stored entry. A mismatch is
    /// indistinguishable from a miss; callers rehash either way.
    #[must_use]
    pub fn lookup(&self, path: &Path, size: u64, modified: SystemTime) -> Option<Hash> {
        let key = path_key(path);
        let shard = self.shard_read(&key);
        let entry = shard.entries.get(&key)?;
        if !entry.matches(size, modified) {
            return None;
        }
        entry.hash_bytes()
    }

    /// Store a freshly computed hash and mark the path live.
    pub fn record(&self, path: &Path, size: u64, modified: SystemTime, hash: &Hash) {
        let key = path_key(path);
        let mut shard = self.shard_write(&key);
        shard.live.insert(key.clone());
        shard.entries.insert(key, CacheEntry::new(size, modified, hash));
    }

    /// Mark a path as observed this run without touching its entry.
    pub fn mark_live(&self, path: &Path) {
        let key = path_key(path);
        let mut shard = self.shard_write(&key);
        shard.live.insert(key);
    }

    /// Drop the entry for a path whose file was removed or replaced.
    pub fn invalidate(&self, path: &Path) {
        let key = path_key(path);
        let mut shard = self.shard_write(&key);
        shard.entries.remove(&key);
        shard.live.remove(&key);
    }

    /// Update the stored `(size, mtime)` for a path whose content is
    /// unchanged, so the next run still trusts the existing hash.
    pub fn refresh_stat(&self, path: &Path, size: u64, modified: SystemTime) {
        let key = path_key(path);
        let mut shard = self.shard_write(&key);
        if let Some(entry) = shard.entries.get_mut(&key) {
            entry.size = size;
            entry.mtime_ns = mtime_to_nanos(modified);
        }
    }

    /// Drop every entry not marked live this run. Returns the number dropped.
    ///
    /// Callers skip this after an interrupted run, since an unfinished scan
    /// would otherwise discard entries for files it never reached.
    pub fn prune(&self) -> usize {
        let mut dropped = 0;
        for lock in &self.shards {
            let mut shard = lock.write().unwrap_or_else(PoisonError::into_inner);
            let before = shard.entries.len();
            let Shard { entries, live } = &mut *shard;
            entries.retain(|key, _| live.contains(key));
            dropped += before - entries.len();
        }
        if dropped > 0 {
            log::debug!("cache: pruned {dropped} stale entries");
        }
        dropped
    }

    /// Number of entries across all shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|lock| {
                lock.read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entries
                    .len()
            })
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the snapshot to `path` via a temp file and atomic rename.
    ///
    /// # Errors
    ///
    /// Serialization or I/O failure; the previous snapshot stays intact.
    pub fn persist(&self, path: &Path) -> CacheResult<()> {
        let mut entries = BTreeMap::new();
        for lock in &self.shards {
            let shard = lock.read().unwrap_or_else(PoisonError::into_inner);
            for (key, entry) in &shard.entries {
                entries.insert(key.clone(), entry.clone());
            }
        }
        let count = entries.len();

        let snapshot = CacheSnapshot {
            version: CACHE_VERSION,
            entries,
        };
        let payload = serde_json::to_string(&snapshot)?;
        let envelope = CacheEnvelope {
            checksum: sha256_hex(payload.as_bytes()),
            cache: snapshot,
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        let tmp = path.with_extension("json.tmp");
        write_file(&tmp, json.as_bytes()).map_err(|source| CacheError::Write {
            path: tmp.clone(),
            source,
        })?;
        atomic_rename(&tmp, path).map_err(|source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("cache: persisted {count} entries to {}", path.display());
        Ok(())
    }

    fn shard_read(&self, key: &str) -> RwLockReadGuard<'_, Shard> {
        self.shards[shard_index(key)]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn shard_write(&self, key: &str) -> RwLockWriteGuard<'_, Shard> {
        self.shards[shard_index(key)]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn shard_index(key: &str) -> usize {
    use std::hash::{Hash as _, Hasher as _};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % SHARD_COUNT
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    // Data must reach disk before the rename makes it the live snapshot.
    file.sync_all()?;
    Ok(())
}

fn atomic_rename(from: &Path, to: &Path) -> std::io::Result<()> {
    // Windows refuses to rename over an existing file.
    #[cfg(windows)]
    {
        if to.exists() {
            std::fs::remove_file(to)?;
        }
    }
    std::fs::rename(from, to)
}
