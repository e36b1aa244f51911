//! Directory traversal that produces duplicate candidates.
//!
//! # Overview
//!
//! Each configured directory is walked in deterministic name order with
//! [`walkdir`], honoring its recursion depth, skip list, and hidden-file
//! setting. Name rules run first: a `skip` match drops the entry, while a
//! `discard!` or `erase!` match emits an unhashed record carrying the rule
//! action so later stages can act on it without comparing content. Everything
//! else passes the size and age bounds before becoming a hash candidate.
//!
//! Walkers share a [`WalkState`] across directories. The shared seen-path set
//! resolves nested roots (the first walker to claim a path keeps it) and the
//! shared [`HardlinkTracker`] collapses alternate names for the same inode.
//! Unreadable entries are reported as [`ScanError`] values and never abort
//! the walk.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

use crate::config::{CompiledFilter, RuleAction, ScanDirectory};

use super::hardlink::HardlinkTracker;
use super::paths::path_key;
use super::{FileRecord, ScanError};

/// Mutable walk state shared by all directory walkers in one scan.
#[derive(Debug, Default)]
pub struct WalkState {
    /// Normalized keys of paths already claimed by a walker.
    pub seen: HashSet<String>,
    /// Inodes already claimed by a walker.
    pub hardlinks: HardlinkTracker,
    /// Candidate and rule-matched records collected so far.
    pub records: Vec<FileRecord>,
    /// Non-fatal problems encountered during the walk.
    pub errors: Vec<ScanError>,
    /// Entries dropped because their inode was already claimed.
    pub hardlinks_skipped: u64,
}

/// Walks one configured directory into a shared [`WalkState`].
#[derive(Debug)]
pub struct DirectoryWalker<'a> {
    dir_index: usize,
    dir: &'a ScanDirectory,
    global_rules: &'a CompiledFilter,
    follow_symlinks: bool,
    now: SystemTime,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl<'a> DirectoryWalker<'a> {
    #[must_use]
    pub fn new(
        dir_index: usize,
        dir: &'a ScanDirectory,
        global_rules: &'a CompiledFilter,
        follow_symlinks: bool,
        now: SystemTime,
    ) -> Self {
        Self {
            dir_index,
            dir,
            global_rules,
            follow_symlinks,
            now,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag checked between entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the directory, appending records and errors to `state`.
    ///
    /// Returns `true` when the walk stopped early because shutdown was
    /// requested.
    pub fn walk_into(&self, state: &mut WalkState) -> bool {
        let walker = WalkDir::new(&self.dir.root)
            .follow_links(self.follow_symlinks)
            .min_depth(1)
            .max_depth(self.dir.max_depth)
            .sort_by_file_name();

        let iter = walker
            .into_iter()
            .filter_entry(|entry| self.should_descend(entry));

        for entry in iter {
            if self.is_shutdown_requested() {
                log::debug!("Walk interrupted in {}", self.dir.root.display());
                return true;
            }
            match entry {
                Ok(entry) => self.process_entry(entry, state),
                Err(error) => state.errors.push(self.map_walk_error(error)),
            }
        }
        false
    }

    /// Predicate for [`walkdir`]'s `filter_entry`; returning `false` on a
    /// directory prunes its whole subtree.
    fn should_descend(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if !self.dir.include_hidden && name.starts_with('.') {
            log::trace!("Skipping hidden entry: {}", entry.path().display());
            return false;
        }
        if entry.file_type().is_dir() && self.dir.skip_subdirs.contains(name.as_ref()) {
            log::debug!("Skipping subdirectory: {}", entry.path().display());
            return false;
        }
        true
    }

    fn process_entry(&self, entry: DirEntry, state: &mut WalkState) {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return;
        }
        if entry.path_is_symlink() && !self.follow_symlinks {
            log::trace!("Skipping symlink: {}", entry.path().display());
            return;
        }
        if !file_type.is_file() {
            return;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(error) => {
                state.errors.push(self.map_walk_error(error));
                return;
            }
        };

        // Name rules first: directory rules shadow global ones.
        let file_name = entry.file_name().to_string_lossy();
        let rule_match = match self
            .dir
            .rules
            .exclude_action(&file_name)
            .or_else(|| self.global_rules.exclude_action(&file_name))
        {
            Some(RuleAction::Skip) => {
                log::trace!("Excluded by rule: {}", entry.path().display());
                return;
            }
            Some(action @ (RuleAction::Discard | RuleAction::Erase)) => Some(action),
            None => None,
        };

        let size = metadata.len();
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        // Size and age bounds select duplicate candidates; rule-matched
        // records are already decided and bypass them.
        if rule_match.is_none() {
            if size == 0 {
                log::debug!("Skipping empty file: {}", entry.path().display());
                return;
            }
            if !(self.dir.rules.size_ok(size) && self.global_rules.size_ok(size)) {
                log::trace!("Outside size bounds: {}", entry.path().display());
                return;
            }
            if !(self.dir.rules.age_ok(modified, self.now)
                && self.global_rules.age_ok(modified, self.now))
            {
                log::trace!("Outside age bounds: {}", entry.path().display());
                return;
            }
        }

        // Nested roots walk most specific first, so the first claim wins.
        if !state.seen.insert(path_key(entry.path())) {
            log::trace!("Already claimed by an earlier walk: {}", entry.path().display());
            return;
        }

        if rule_match.is_none() && state.hardlinks.is_hardlink(&metadata) {
            log::debug!("Skipping hardlink: {}", entry.path().display());
            state.hardlinks_skipped += 1;
            return;
        }

        state.records.push(FileRecord {
            path: entry.into_path(),
            dir_index: self.dir_index,
            size,
            modified,
            hash: None,
            cache_hit: false,
            rule_match,
        });
    }

    fn map_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.dir.root.clone(), Path::to_path_buf);
        match error.io_error().map(io::Error::kind) {
            Some(io::ErrorKind::PermissionDenied) => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(io::ErrorKind::NotFound) => {
                log::debug!("Path vanished during walk: {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("Walk error for {}: {}", path.display(), error);
                let message = error.to_string();
                let source = error.into_io_error().unwrap_or_else(|| io::Error::other(message));
                ScanError::Io { path, source }
            }
        }
    }
}
