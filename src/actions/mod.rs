//! Filesystem actions for resolved duplicates.
//!
//! # Overview
//!
//! This module turns group resolutions and always-act matches into
//! filesystem changes:
//! - `backend` puts every mutation behind the [`FsBackend`] trait
//! - `prompt` supplies confirmation answers for `prompt`-policy duplicates
//! - `executor` walks the per-record decision table and applies policies
//!
//! # Safety
//!
//! Destructive actions re-stat their target and skip files modified since
//! the scan, and a duplicate group never loses its kept copy. Dry-run
//! reports every decision without touching the filesystem or the prompter.
//!
//! ```no_run
//! use dupewarden::actions::{FsBackend, SystemBackend};
//! use std::path::Path;
//!
//! let backend = SystemBackend;
//! backend.trash(Path::new("/data/old/copy of report.txt"))?;
//! # Ok::<(), dupewarden::actions::ActionError>(())
//! ```

pub mod backend;
pub mod executor;
pub mod prompt;

// Re-export commonly used types
pub use backend::{ActionError, FsBackend, LinkStatus, SystemBackend};
pub use executor::{ActionRecord, ActionStats, Disposition, ExecutionOutcome, PolicyExecutor};
pub use prompt::{AssumeYes, Confirmation, ConsolePrompter, Prompter, ScriptedPrompter};
