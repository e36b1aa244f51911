//! End-of-run reporting.
//!
//! # Overview
//!
//! Collects the scan, grouping, and execution summaries into one report:
//! a colored terminal summary (suppressed colors under `--no-color`,
//! `NO_COLOR`, or a non-TTY stdout) and an optional machine-readable CSV
//! action log for spreadsheets and audits.
//!
//! # CSV Columns
//!
//! - `path`: Absolute path to the file
//! - `disposition`: What happened to it (`kept`, `trashed`, `deleted`,
//!   `hardlinked`, `skipped`, `vetoed`, `failed`)
//! - `detail`: Link target, skip reason, or error message
//! - `size`: File size in bytes

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;

use bytesize::ByteSize;
use serde::Serialize;
use thiserror::Error;
use yansi::Paint;

use crate::actions::ExecutionOutcome;
use crate::duplicates::GroupingStats;
use crate::scanner::ScanStats;

/// Errors that can occur while exporting the report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row in the CSV action log.
#[derive(Debug, Serialize)]
struct CsvRow {
    path: String,
    disposition: String,
    detail: String,
    size: u64,
}

/// Everything a finished run reports.
pub struct RunReport<'a> {
    pub scan: &'a ScanStats,
    /// Unreadable files and directories skipped during the scan.
    pub scan_errors: usize,
    pub grouping: &'a GroupingStats,
    pub execution: &'a ExecutionOutcome,
    pub dry_run: bool,
}

impl RunReport<'_> {
    /// Scan errors plus per-file action failures.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.scan_errors + self.execution.failures.len()
    }

    /// Write the human-readable summary.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn render<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let stats = &self.execution.stats;

        writeln!(writer)?;
        if self.dry_run {
            writeln!(writer, "{}", "Dry run: no files were changed".yellow().bold())?;
        }
        if self.execution.interrupted {
            writeln!(writer, "{}", "Interrupted: partial results".yellow().bold())?;
        }
        writeln!(writer, "{}", "Run summary".bold())?;
        writeln!(
            writer,
            "  Scanned:    {} files, {} hashed ({} read, {} cache hits)",
            self.scan.files_found,
            self.scan.files_hashed,
            ByteSize(self.scan.bytes_hashed),
            self.scan.cache_hits
        )?;
        writeln!(
            writer,
            "  Duplicates: {} groups, {} extra copies ({} wasted)",
            self.grouping.duplicate_groups,
            self.grouping.duplicate_files,
            ByteSize(self.grouping.wasted_bytes)
        )?;
        writeln!(writer, "  Kept:       {}", stats.kept)?;

        let reclaimed = format!(
            "{} {}",
            ByteSize(stats.bytes_freed),
            if self.dry_run { "reclaimable" } else { "reclaimed" }
        );
        writeln!(
            writer,
            "  Acted:      {} duplicates, {} matched ({})",
            stats.duplicates_acted,
            stats.matched_acted,
            if self.dry_run {
                reclaimed.as_str().dim()
            } else {
                reclaimed.as_str().green()
            }
        )?;
        writeln!(writer, "  Skipped:    {}", stats.duplicates_skipped)?;
        if stats.conflicts > 0 {
            writeln!(writer, "  Conflicts:  {}", stats.conflicts.yellow().bold())?;
        }
        let errors = self.error_count();
        if errors > 0 {
            writeln!(writer, "  Errors:     {}", errors.red().bold())?;
        }
        Ok(())
    }

    /// Write the CSV action log to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if writing or serialization fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for action in &self.execution.actions {
            let row = CsvRow {
                path: action.path.to_string_lossy().to_string(),
                disposition: action.disposition.to_string(),
                detail: action.detail.clone(),
                size: action.size,
            };
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Write the CSV action log to `path`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if the file cannot be created or written.
    pub fn save_csv(&self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        self.write_csv(file)?;
        log::info!("Wrote action report to {}", path.display());
        Ok(())
    }
}

/// Disable coloring when asked to, or when stdout is not a terminal.
pub fn init_colors(no_color: bool) {
    if no_color || std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal() {
        yansi::disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionRecord, ActionStats, Disposition};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_execution() -> ExecutionOutcome {
        ExecutionOutcome {
            actions: vec![
                ActionRecord {
                    path: PathBuf::from("/a/x.txt"),
                    disposition: Disposition::Kept,
                    detail: String::new(),
                    size: 100,
                },
                ActionRecord {
                    path: PathBuf::from("/b/x.txt"),
                    disposition: Disposition::Trashed,
                    detail: String::new(),
                    size: 100,
                },
            ],
            failures: Vec::new(),
            stats: ActionStats {
                kept: 1,
                duplicates_acted: 1,
                duplicates_skipped: 0,
                matched_acted: 0,
                conflicts: 0,
                bytes_freed: 100,
            },
            interrupted: false,
        }
    }

    fn sample_report<'a>(
        scan: &'a ScanStats,
        grouping: &'a GroupingStats,
        execution: &'a ExecutionOutcome,
    ) -> RunReport<'a> {
        RunReport {
            scan,
            scan_errors: 0,
            grouping,
            execution,
            dry_run: false,
        }
    }

    // ==================== Render Tests ====================

    #[test]
    fn test_render_contains_counts() {
        yansi::disable();
        let scan = ScanStats {
            files_found: 10,
            files_hashed: 8,
            bytes_hashed: 800,
            ..ScanStats::default()
        };
        let grouping = GroupingStats {
            candidates: 8,
            unique_files: 6,
            duplicate_groups: 1,
            duplicate_files: 1,
            wasted_bytes: 100,
        };
        let execution = sample_execution();
        let report = sample_report(&scan, &grouping, &execution);

        let mut buffer = Vec::new();
        report.render(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Run summary"));
        assert!(text.contains("10 files"));
        assert!(text.contains("1 groups"));
        assert!(text.contains("Kept:       1"));
        assert!(text.contains("reclaimed"));
        assert!(!text.contains("Dry run"));
        assert!(!text.contains("Conflicts"));
        assert!(!text.contains("Errors"));
    }

    #[test]
    fn test_render_dry_run_banner() {
        yansi::disable();
        let scan = ScanStats::default();
        let grouping = GroupingStats::default();
        let execution = sample_execution();
        let mut report = sample_report(&scan, &grouping, &execution);
        report.dry_run = true;

        let mut buffer = Vec::new();
        report.render(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Dry run: no files were changed"));
        assert!(text.contains("reclaimable"));
    }

    #[test]
    fn test_render_conflicts_and_errors() {
        yansi::disable();
        let scan = ScanStats::default();
        let grouping = GroupingStats::default();
        let mut execution = sample_execution();
        execution.stats.conflicts = 2;
        execution
            .failures
            .push((PathBuf::from("/b/y.txt"), "modified since scan".to_string()));
        let mut report = sample_report(&scan, &grouping, &execution);
        report.scan_errors = 3;

        let mut buffer = Vec::new();
        report.render(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Conflicts:  2"));
        assert!(text.contains("Errors:     4"));
    }

    #[test]
    fn test_error_count_sums_scan_and_action_failures() {
        let scan = ScanStats::default();
        let grouping = GroupingStats::default();
        let mut execution = sample_execution();
        execution
            .failures
            .push((PathBuf::from("/b/y.txt"), "permission denied".to_string()));
        let mut report = sample_report(&scan, &grouping, &execution);
        report.scan_errors = 2;

        assert_eq!(report.error_count(), 3);
    }

    // ==================== CSV Tests ====================

    #[test]
    fn test_csv_basic() {
        let scan = ScanStats::default();
        let grouping = GroupingStats::default();
        let execution = sample_execution();
        let report = sample_report(&scan, &grouping, &execution);

        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("path,disposition,detail,size"));
        assert!(text.contains("/a/x.txt,kept,,100"));
        assert!(text.contains("/b/x.txt,trashed,,100"));
    }

    #[test]
    fn test_csv_quotes_paths_with_commas() {
        let scan = ScanStats::default();
        let grouping = GroupingStats::default();
        let mut execution = sample_execution();
        execution.actions.push(ActionRecord {
            path: PathBuf::from("/c/file,with,comma.txt"),
            disposition: Disposition::Deleted,
            detail: String::new(),
            size: 5,
        });
        let report = sample_report(&scan, &grouping, &execution);

        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains('"'));
        assert!(text.contains("file,with,comma.txt"));
    }

    #[test]
    fn test_save_csv_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");

        let scan = ScanStats::default();
        let grouping = GroupingStats::default();
        let execution = sample_execution();
        let report = sample_report(&scan, &grouping, &execution);

        report.save_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("path,disposition,detail,size"));
    }
}
