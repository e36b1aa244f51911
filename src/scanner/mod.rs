//! File discovery and content hashing.
//!
//! # Overview
//!
//! The scanner turns the resolved configuration into a list of
//! [`FileRecord`]s ready for grouping. It walks every configured directory
//! (most specific root first, so nested roots claim their own files), then
//! hashes the surviving candidates on a bounded rayon pool. The hash cache
//! is consulted before any file is read: a record whose size and mtime match
//! its cache entry reuses the stored digest, everything else is hashed and
//! written back.
//!
//! # Architecture
//!
//! - [`walker`]: per-directory traversal, rules, and bounds
//! - [`hasher`]: BLAKE3 digests with an mmap fast path for large files
//! - [`hardlink`]: inode tracking so alternate names are claimed once
//! - [`paths`]: Unicode normalization for cache keys
//!
//! Scan problems are collected as [`ScanError`] values; a failed file never
//! aborts the run.

pub mod hardlink;
pub mod hasher;
pub mod paths;
pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use rayon::prelude::*;

use crate::cache::HashCache;
use crate::config::{ResolvedConfig, RuleAction};
use crate::progress::ProgressCallback;

pub use hardlink::HardlinkTracker;
pub use hasher::{hash_to_hex, hex_to_hash, FileHasher, Hash};
pub use paths::{normalize_path_str, path_key};
pub use walker::{DirectoryWalker, WalkState};

/// A file observed during the walk.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// On-disk path exactly as walked; actions always use this form.
    pub path: PathBuf,
    /// Index into the resolved directory list this record belongs to.
    pub dir_index: usize,
    /// Size in bytes at walk time.
    pub size: u64,
    /// Modification time at walk time.
    pub modified: SystemTime,
    /// Content digest; `None` for rule-matched records and hash failures.
    pub hash: Option<Hash>,
    /// Whether the digest was served from the cache.
    pub cache_hit: bool,
    /// Always-act rule that matched the file name, if any.
    pub rule_match: Option<RuleAction>,
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A path disappeared between discovery and use.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A candidate file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Errors that can occur while hashing a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file vanished before it could be read.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Counters describing one scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    /// Records produced by the walk, rule matches included.
    pub files_found: usize,
    /// Records tagged by a `discard!` or `erase!` rule.
    pub rule_matched: usize,
    /// Digests served from the cache.
    pub cache_hits: usize,
    /// Files actually read and hashed.
    pub files_hashed: usize,
    /// Bytes read while hashing.
    pub bytes_hashed: u64,
    /// Entries dropped because their inode was already claimed.
    pub hardlinks_skipped: u64,
}

/// Result of a scan: records, collected problems, and counters.
#[derive(Debug)]
pub struct ScanOutcome {
    pub records: Vec<FileRecord>,
    pub errors: Vec<ScanError>,
    pub stats: ScanStats,
    /// `true` when shutdown was requested before the scan finished.
    pub interrupted: bool,
}

/// Walks and hashes everything the configuration names.
pub struct Scanner<'a> {
    config: &'a ResolvedConfig,
    cache: &'a HashCache,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

enum HashOutcome {
    Done { hash: Hash, cache_hit: bool },
    Failed(HashError),
    Skipped,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(config: &'a ResolvedConfig, cache: &'a HashCache) -> Self {
        Self {
            config,
            cache,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag checked between files.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback for the walk and hash phases.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Run the walk and hash phases.
    pub fn scan(&self) -> ScanOutcome {
        let start = Instant::now();
        let now = SystemTime::now();

        self.notify_phase_start("walk", 0);
        let (mut state, walk_interrupted) = self.walk_directories(now);
        self.notify_phase_end("walk");

        let mut stats = ScanStats {
            files_found: state.records.len(),
            rule_matched: state
                .records
                .iter()
                .filter(|r| r.rule_match.is_some())
                .count(),
            hardlinks_skipped: state.hardlinks_skipped,
            ..ScanStats::default()
        };
        log::info!(
            "Walk complete: {} files ({} rule-matched), {} hardlinks skipped, {} errors",
            stats.files_found,
            stats.rule_matched,
            stats.hardlinks_skipped,
            state.errors.len()
        );

        let hash_interrupted = if walk_interrupted {
            true
        } else {
            self.hash_records(&mut state, &mut stats)
        };

        log::info!(
            "Hashed {} files ({}) in {:.2?}, {} cache hits",
            stats.files_hashed,
            bytesize::ByteSize(stats.bytes_hashed),
            start.elapsed(),
            stats.cache_hits
        );

        ScanOutcome {
            records: state.records,
            errors: state.errors,
            stats,
            interrupted: walk_interrupted || hash_interrupted,
        }
    }

    fn walk_directories(&self, now: SystemTime) -> (WalkState, bool) {
        // Deepest roots walk first so a nested root claims its own files
        // before an enclosing one reaches them. Equal depths keep their
        // configured order.
        let mut order: Vec<usize> = (0..self.config.directories.len()).collect();
        order.sort_by_key(|&i| {
            std::cmp::Reverse(self.config.directories[i].root.components().count())
        });

        let mut state = WalkState::default();
        for index in order {
            let dir = &self.config.directories[index];
            log::debug!("Walking {}", dir.root.display());
            let mut walker = DirectoryWalker::new(
                index,
                dir,
                &self.config.global_rules,
                self.config.follow_symlinks,
                now,
            );
            if let Some(flag) = &self.shutdown_flag {
                walker = walker.with_shutdown_flag(Arc::clone(flag));
            }
            if walker.walk_into(&mut state) {
                return (state, true);
            }
            self.notify_progress(state.records.len(), &dir.root);
        }
        (state, false)
    }

    /// Hash all candidate records in place, consulting the cache first.
    ///
    /// Returns `true` when shutdown interrupted the phase.
    fn hash_records(&self, state: &mut WalkState, stats: &mut ScanStats) -> bool {
        let candidates: Vec<usize> = state
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.rule_match.is_none())
            .map(|(i, _)| i)
            .collect();

        self.notify_phase_start("hash", candidates.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .unwrap_or_else(|_| {
                log::warn!("Failed to create custom thread pool, using default");
                rayon::ThreadPoolBuilder::new().build().unwrap()
            });

        let hasher = FileHasher::new(self.config.large_file_threshold);
        let completed = AtomicUsize::new(0);
        let records = &state.records;

        let results: Vec<(usize, HashOutcome)> = pool.install(|| {
            candidates
                .par_iter()
                .map(|&index| {
                    let record = &records[index];
                    if self.is_shutdown_requested() {
                        return (index, HashOutcome::Skipped);
                    }

                    if let Some(hash) =
                        self.cache.lookup(&record.path, record.size, record.modified)
                    {
                        self.cache.mark_live(&record.path);
                        let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        self.notify_progress(current, &record.path);
                        return (
                            index,
                            HashOutcome::Done {
                                hash,
                                cache_hit: true,
                            },
                        );
                    }

                    let outcome = match hasher.hash_file(&record.path, record.size) {
                        Ok(hash) => {
                            self.cache
                                .record(&record.path, record.size, record.modified, &hash);
                            self.notify_item_completed(record.size);
                            HashOutcome::Done {
                                hash,
                                cache_hit: false,
                            }
                        }
                        Err(error) => {
                            log::warn!("Failed to hash {}: {}", record.path.display(), error);
                            HashOutcome::Failed(error)
                        }
                    };
                    let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.notify_progress(current, &record.path);
                    (index, outcome)
                })
                .collect()
        });

        for (index, outcome) in results {
            match outcome {
                HashOutcome::Done { hash, cache_hit } => {
                    if cache_hit {
                        stats.cache_hits += 1;
                    } else {
                        stats.files_hashed += 1;
                        stats.bytes_hashed += state.records[index].size;
                    }
                    let record = &mut state.records[index];
                    record.hash = Some(hash);
                    record.cache_hit = cache_hit;
                }
                HashOutcome::Failed(error) => {
                    // A failed read leaves any prior cache entry in place.
                    self.cache.mark_live(&state.records[index].path);
                    state.errors.push(ScanError::from(error));
                }
                HashOutcome::Skipped => {}
            }
        }

        self.notify_phase_end("hash");
        self.is_shutdown_requested()
    }

    fn notify_phase_start(&self, phase: &str, total: usize) {
        if let Some(progress) = &self.progress {
            progress.on_phase_start(phase, total);
        }
    }

    fn notify_progress(&self, current: usize, path: &Path) {
        if let Some(progress) = &self.progress {
            progress.on_progress(current, &path.to_string_lossy());
        }
    }

    fn notify_item_completed(&self, bytes: u64) {
        if let Some(progress) = &self.progress {
            progress.on_item_completed(bytes);
        }
    }

    fn notify_phase_end(&self, phase: &str) {
        if let Some(progress) = &self.progress {
            progress.on_phase_end(phase);
        }
    }
}
