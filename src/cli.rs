//! Command-line interface definitions for dupewarden.
//!
//! Everything that shapes a run lives in the configuration file; the CLI
//! only selects that file, toggles dry-run, and adjusts output. Parsing
//! uses the clap derive API.
//!
//! # Example
//!
//! ```bash
//! # Run with the discovered configuration file
//! dupewarden
//!
//! # Preview every action without touching a file
//! dupewarden --dry-run -v
//!
//! # Explicit configuration, prompts confirmed in bulk
//! dupewarden --config ~/sweep.toml --yes
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Policy-driven duplicate file cleaner.
///
/// Dupewarden scans the directories listed in its configuration file, finds
/// files with identical content (BLAKE3), picks one copy per group by
/// directory priority, and applies each losing directory's policy to the
/// rest: trash, delete, hardlink, or prompt.
#[derive(Debug, Parser)]
#[command(name = "dupewarden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    ///
    /// When omitted, discovery tries `DUPEWARDEN_CONFIG`, the platform
    /// config directory, then `./dupewarden.toml`.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report what every policy would do without changing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the hash cache snapshot
    ///
    /// Overrides `general.cache_file` from the configuration.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Write the per-file action log to a CSV file
    #[arg(long, value_name = "PATH")]
    pub report_csv: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}
