//! Policy execution over resolved duplicate groups.
//!
//! # Overview
//!
//! The executor turns group resolutions and always-act matches into
//! filesystem actions through an injected [`FsBackend`] and [`Prompter`].
//! Per record, in precedence order: an always-act match is applied
//! unconditionally, vetoed and kept records stay untouched, and every
//! remaining duplicate is dispatched under its own directory's policy.
//!
//! Destructive actions re-stat the target first and skip files that changed
//! since the scan. Groups execute in parallel; actions touching the same
//! kept path serialize on a per-path lock. In dry-run mode decisions are
//! counted and reported without touching the backend or the prompter.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::cache::HashCache;
use crate::config::{Policy, ResolvedConfig};
use crate::duplicates::{DuplicateGroup, GroupResolution, MatchAction, MatchedFile};
use crate::progress::ProgressCallback;
use crate::scanner::FileRecord;

use super::backend::{FsBackend, LinkStatus};
use super::prompt::{Confirmation, Prompter};

/// What happened (or would happen, under dry-run) to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Kept,
    Trashed,
    Deleted,
    Hardlinked,
    Skipped,
    Vetoed,
    Failed,
}

impl Disposition {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kept => "kept",
            Self::Trashed => "trashed",
            Self::Deleted => "deleted",
            Self::Hardlinked => "hardlinked",
            Self::Skipped => "skipped",
            Self::Vetoed => "vetoed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the run's action log.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub path: PathBuf,
    pub disposition: Disposition,
    /// Link target, skip reason, or error message. Empty when there is
    /// nothing to add.
    pub detail: String,
    pub size: u64,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStats {
    /// Kept group representatives left untouched on disk.
    pub kept: usize,
    /// Duplicates removed, trashed, or hardlinked.
    pub duplicates_acted: usize,
    /// Duplicates left in place (keep policy, declined or unavailable
    /// prompt).
    pub duplicates_skipped: usize,
    /// Always-act matches applied.
    pub matched_acted: usize,
    /// Groups containing keep-vetoed records.
    pub conflicts: usize,
    /// Bytes reclaimed (or reclaimable, under dry-run).
    pub bytes_freed: u64,
}

impl ActionStats {
    fn merge(&mut self, other: &ActionStats) {
        self.kept += other.kept;
        self.duplicates_acted += other.duplicates_acted;
        self.duplicates_skipped += other.duplicates_skipped;
        self.matched_acted += other.matched_acted;
        self.conflicts += other.conflicts;
        self.bytes_freed += other.bytes_freed;
    }
}

/// Everything the run produced, ready for reporting.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    /// Per-record action log, in group order.
    pub actions: Vec<ActionRecord>,
    /// Per-file failures; these never abort the remaining records.
    pub failures: Vec<(PathBuf, String)>,
    pub stats: ActionStats,
    /// `true` when shutdown was requested before all groups were processed.
    pub interrupted: bool,
}

/// Applies resolved policies through injected backends.
pub struct PolicyExecutor<'a> {
    config: &'a ResolvedConfig,
    cache: &'a HashCache,
    backend: &'a dyn FsBackend,
    prompter: &'a dyn Prompter,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

/// Unit of parallel work: a whole group, or a matched record outside any
/// group.
enum WorkItem<'a> {
    Group {
        group: &'a DuplicateGroup,
        resolution: &'a GroupResolution,
    },
    Standalone(MatchedFile),
}

/// Destructive backend operations that share the stale-record guard.
#[derive(Clone, Copy)]
enum Removal {
    Trash,
    Delete,
}

#[derive(Default)]
struct TaskOutcome {
    actions: Vec<ActionRecord>,
    failures: Vec<(PathBuf, String)>,
    stats: ActionStats,
}

impl TaskOutcome {
    fn push_action(
        &mut self,
        record: &FileRecord,
        disposition: Disposition,
        detail: impl Into<String>,
    ) {
        self.actions.push(ActionRecord {
            path: record.path.clone(),
            disposition,
            detail: detail.into(),
            size: record.size,
        });
    }

    fn push_failure(&mut self, record: &FileRecord, message: String) {
        log::warn!("Action failed for {}: {message}", record.path.display());
        self.failures.push((record.path.clone(), message.clone()));
        self.push_action(record, Disposition::Failed, message);
    }
}

/// Lazily-created locks keyed by kept-record path.
#[derive(Default)]
struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    fn acquire(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }
}

impl<'a> PolicyExecutor<'a> {
    #[must_use]
    pub fn new(
        config: &'a ResolvedConfig,
        cache: &'a HashCache,
        backend: &'a dyn FsBackend,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            config,
            cache,
            backend,
            prompter,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag checked before each group starts.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback for the apply phase.
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

    /// Apply policies to every group and standalone match.
    ///
    /// `resolutions` must be parallel to `groups`; all index slots refer
    /// into `records`.
    pub fn execute(
        &self,
        records: &[FileRecord],
        groups: &[DuplicateGroup],
        resolutions: &[GroupResolution],
        matches: &[MatchedFile],
    ) -> ExecutionOutcome {
        debug_assert_eq!(groups.len(), resolutions.len());

        let matched_by_record: HashMap<usize, MatchAction> =
            matches.iter().map(|m| (m.record, m.action)).collect();
        let grouped: HashSet<usize> = groups
            .iter()
            .flat_map(|group| group.members.iter().copied())
            .collect();

        let mut work: Vec<WorkItem> = groups
            .iter()
            .zip(resolutions)
            .map(|(group, resolution)| WorkItem::Group { group, resolution })
            .collect();
        let standalone_start = work.len();
        work.extend(
            matches
                .iter()
                .filter(|m| !grouped.contains(&m.record))
                .map(|m| WorkItem::Standalone(*m)),
        );

        let total: usize = work
            .iter()
            .map(|item| match item {
                WorkItem::Group { group, .. } => group.len(),
                WorkItem::Standalone(_) => 1,
            })
            .sum();

        log::info!(
            "Applying policies: {} groups, {} standalone matches{}",
            standalone_start,
            work.len() - standalone_start,
            if self.config.dry_run { " (dry run)" } else { "" }
        );
        self.notify_phase_start("apply", total);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .unwrap_or_else(|_| {
                log::warn!("Failed to create custom thread pool, using default");
                rayon::ThreadPoolBuilder::new().build().unwrap()
            });

        let locks = PathLocks::default();
        let completed = AtomicUsize::new(0);

        let outcomes: Vec<TaskOutcome> = pool.install(|| {
            work.par_iter()
                .map(|item| self.run_item(item, records, &matched_by_record, &locks, &completed))
                .collect()
        });

        self.notify_phase_end("apply");

        let mut outcome = ExecutionOutcome::default();
        for task in outcomes {
            outcome.stats.merge(&task.stats);
            outcome.actions.extend(task.actions);
            outcome.failures.extend(task.failures);
        }
        outcome.interrupted = self.is_shutdown_requested();

        log::info!(
            "Policies applied: {} kept, {} duplicates acted, {} skipped, {} matched, {} conflicts, {} failures, {} reclaimed",
            outcome.stats.kept,
            outcome.stats.duplicates_acted,
            outcome.stats.duplicates_skipped,
            outcome.stats.matched_acted,
            outcome.stats.conflicts,
            outcome.failures.len(),
            bytesize::ByteSize(outcome.stats.bytes_freed)
        );

        outcome
    }

    fn run_item(
        &self,
        item: &WorkItem,
        records: &[FileRecord],
        matched: &HashMap<usize, MatchAction>,
        locks: &PathLocks,
        completed: &AtomicUsize,
    ) -> TaskOutcome {
        let mut out = TaskOutcome::default();

        // In-flight work finishes, nothing new starts.
        if self.is_shutdown_requested() {
            return out;
        }

        match item {
            WorkItem::Group { group, resolution } => {
                self.run_group(group, resolution, records, matched, locks, completed, &mut out);
            }
            WorkItem::Standalone(matched_file) => {
                let record = &records[matched_file.record];
                let lock = locks.acquire(&record.path);
                let _guard = lock.lock().unwrap();
                self.apply_match(record, matched_file.action, &mut out);
                self.tick(completed, record);
            }
        }

        out
    }

    #[allow(clippy::too_many_arguments)]
    fn run_group(
        &self,
        group: &DuplicateGroup,
        resolution: &GroupResolution,
        records: &[FileRecord],
        matched: &HashMap<usize, MatchAction>,
        locks: &PathLocks,
        completed: &AtomicUsize,
        out: &mut TaskOutcome,
    ) {
        if !resolution.vetoed.is_empty() {
            out.stats.conflicts += 1;
        }

        let kept_path = resolution.kept.map(|index| records[index].path.clone());
        let lock = kept_path.as_ref().map(|path| locks.acquire(path));
        let _guard = lock.as_ref().map(|l| l.lock().unwrap());

        for &member in &group.members {
            let record = &records[member];

            if let Some(&action) = matched.get(&member) {
                self.apply_match(record, action, out);
            } else if resolution.vetoed.contains(&member) {
                out.push_action(record, Disposition::Vetoed, "keep policy veto");
            } else if resolution.kept == Some(member) {
                out.stats.kept += 1;
                out.push_action(record, Disposition::Kept, "");
            } else {
                self.apply_duplicate(record, kept_path.as_deref(), out);
            }

            self.tick(completed, record);
        }

        self.retime_kept(resolution, records, out);
    }

    /// Apply an always-act match, overriding kept/duplicate/vetoed status.
    fn apply_match(&self, record: &FileRecord, action: MatchAction, out: &mut TaskOutcome) {
        let (removal, disposition) = match action {
            MatchAction::Discard => (Removal::Trash, Disposition::Trashed),
            MatchAction::Erase => (Removal::Delete, Disposition::Deleted),
        };

        if self.config.dry_run {
            out.stats.matched_acted += 1;
            out.stats.bytes_freed += record.size;
            out.push_action(record, disposition, action.to_string());
            return;
        }

        match self.remove(record, removal) {
            Ok(()) => {
                out.stats.matched_acted += 1;
                out.stats.bytes_freed += record.size;
                out.push_action(record, disposition, action.to_string());
            }
            Err(message) => out.push_failure(record, message),
        }
    }

    /// Dispatch a non-kept, non-vetoed duplicate under its own directory's
    /// policy.
    fn apply_duplicate(&self, record: &FileRecord, kept_path: Option<&Path>, out: &mut TaskOutcome) {
        match self.config.directories[record.dir_index].policy {
            Policy::Keep => {
                // Extra copies inside one keep directory resolve here.
                out.stats.duplicates_skipped += 1;
                out.push_action(record, Disposition::Skipped, "keep policy");
            }
            Policy::Prompt => self.prompt_duplicate(record, kept_path, out),
            Policy::Hardlink => self.hardlink_duplicate(record, kept_path, out),
            // Always-act directories are matched by the classifier; these
            // arms keep the match exhaustive.
            Policy::Trash | Policy::Discard => {
                self.remove_duplicate(record, Removal::Trash, Disposition::Trashed, "", out);
            }
            Policy::Delete | Policy::Erase => {
                self.remove_duplicate(record, Removal::Delete, Disposition::Deleted, "", out);
            }
        }
    }

    fn remove_duplicate(
        &self,
        record: &FileRecord,
        removal: Removal,
        disposition: Disposition,
        detail: &str,
        out: &mut TaskOutcome,
    ) {
        if self.config.dry_run {
            out.stats.duplicates_acted += 1;
            out.stats.bytes_freed += record.size;
            out.push_action(record, disposition, detail);
            return;
        }

        match self.remove(record, removal) {
            Ok(()) => {
                out.stats.duplicates_acted += 1;
                out.stats.bytes_freed += record.size;
                out.push_action(record, disposition, detail);
            }
            Err(message) => out.push_failure(record, message),
        }
    }

    fn prompt_duplicate(&self, record: &FileRecord, kept_path: Option<&Path>, out: &mut TaskOutcome) {
        if self.config.dry_run {
            out.stats.duplicates_skipped += 1;
            out.push_action(record, Disposition::Skipped, "prompt skipped (dry run)");
            return;
        }

        let description = match kept_path {
            Some(kept) => format!(
                "Delete {} (duplicate of {})?",
                record.path.display(),
                kept.display()
            ),
            None => format!("Delete {}?", record.path.display()),
        };

        match self.prompter.confirm(&description) {
            Confirmation::Yes => {
                self.remove_duplicate(record, Removal::Delete, Disposition::Deleted, "confirmed", out);
            }
            Confirmation::No => {
                out.stats.duplicates_skipped += 1;
                out.push_action(record, Disposition::Skipped, "declined");
            }
            Confirmation::Unavailable => {
                log::debug!(
                    "Prompt unavailable for {}; pass --yes to confirm in bulk",
                    record.path.display()
                );
                out.stats.duplicates_skipped += 1;
                out.push_action(record, Disposition::Skipped, "prompt unavailable");
            }
        }
    }

    fn hardlink_duplicate(
        &self,
        record: &FileRecord,
        kept_path: Option<&Path>,
        out: &mut TaskOutcome,
    ) {
        let Some(kept) = kept_path else {
            out.stats.duplicates_skipped += 1;
            out.push_action(record, Disposition::Skipped, "no kept copy to link");
            return;
        };

        if self.config.dry_run {
            out.stats.duplicates_acted += 1;
            out.stats.bytes_freed += record.size;
            out.push_action(record, Disposition::Hardlinked, kept.display().to_string());
            return;
        }

        if let Err(message) = self.check_unchanged(record) {
            out.push_failure(record, message);
            return;
        }

        match self.backend.hardlink(kept, &record.path) {
            Ok(LinkStatus::Linked) => {
                self.cache.invalidate(&record.path);
                out.stats.duplicates_acted += 1;
                out.stats.bytes_freed += record.size;
                out.push_action(record, Disposition::Hardlinked, kept.display().to_string());
            }
            Ok(LinkStatus::Unsupported) => {
                log::warn!(
                    "Hardlink unsupported for {}; moving to trash instead",
                    record.path.display()
                );
                // The stale guard already passed; go straight to the backend.
                match self.backend.trash(&record.path) {
                    Ok(()) => {
                        self.cache.invalidate(&record.path);
                        out.stats.duplicates_acted += 1;
                        out.stats.bytes_freed += record.size;
                        out.push_action(record, Disposition::Trashed, "hardlink unsupported");
                    }
                    Err(error) => out.push_failure(record, error.to_string()),
                }
            }
            Err(error) => out.push_failure(record, error.to_string()),
        }
    }

    /// Stale guard plus removal plus cache invalidation.
    fn remove(&self, record: &FileRecord, removal: Removal) -> Result<(), String> {
        self.check_unchanged(record)?;

        let result = match removal {
            Removal::Trash => self.backend.trash(&record.path),
            Removal::Delete => self.backend.delete(&record.path),
        };
        result.map_err(|error| error.to_string())?;

        self.cache.invalidate(&record.path);
        Ok(())
    }

    /// Skip files whose live size or mtime no longer matches the scan.
    fn check_unchanged(&self, record: &FileRecord) -> Result<(), String> {
        let (size, modified) = self
            .backend
            .stat(&record.path)
            .map_err(|error| error.to_string())?;
        if size != record.size || modified != record.modified {
            log::warn!("Skipping {}: modified since scan", record.path.display());
            return Err("modified since scan".to_string());
        }
        Ok(())
    }

    /// Advance a rename-flagged kept file's mtime to its newest
    /// same-directory duplicate, then refresh its cache entry so the next
    /// run still cache-hits.
    fn retime_kept(&self, resolution: &GroupResolution, records: &[FileRecord], out: &mut TaskOutcome) {
        if self.config.dry_run {
            return;
        }
        let Some(kept_index) = resolution.kept else {
            return;
        };
        let kept = &records[kept_index];
        let dir = &self.config.directories[kept.dir_index];
        if !dir.rename || !matches!(dir.policy, Policy::Trash | Policy::Delete) {
            return;
        }

        let mut newest = kept.modified;
        for &index in &resolution.duplicates {
            let record = &records[index];
            if record.dir_index == kept.dir_index {
                newest = newest.max(record.modified);
            }
        }
        if newest == kept.modified {
            return;
        }

        let mtime = filetime::FileTime::from_system_time(newest);
        if let Err(error) = filetime::set_file_mtime(&kept.path, mtime) {
            log::warn!(
                "Failed to advance mtime of {}: {error}",
                kept.path.display()
            );
            out.failures
                .push((kept.path.clone(), format!("retime failed: {error}")));
            return;
        }
        log::debug!(
            "Advanced mtime of {} to its newest duplicate",
            kept.path.display()
        );

        // A stale entry would only cost a rehash, so a failed stat is not
        // worth failing the group over.
        match self.backend.stat(&kept.path) {
            Ok((size, modified)) => self.cache.refresh_stat(&kept.path, size, modified),
            Err(error) => log::warn!(
                "Could not refresh cache entry for {}: {error}",
                kept.path.display()
            ),
        }
    }

    fn tick(&self, completed: &AtomicUsize, record: &FileRecord) {
        let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = &self.progress {
            progress.on_progress(current, &record.path.to_string_lossy());
        }
    }

    fn notify_phase_start(&self, phase: &str, total: usize) {
        if let Some(progress) = &self.progress {
            progress.on_phase_start(phase, total);
        }
    }

    fn notify_phase_end(&self, phase: &str) {
        if let Some(progress) = &self.progress {
            progress.on_phase_end(phase);
        }
    }
}
