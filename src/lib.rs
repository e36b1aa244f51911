//! Dupewarden - policy-driven duplicate file cleaner.
//!
//! Scans the directories named in a TOML configuration, groups files by
//! content hash (BLAKE3), keeps one copy per group by directory priority,
//! and applies each losing directory's policy: trash, delete, hardlink,
//! prompt, or keep. A persistent hash cache makes repeat runs skip every
//! unchanged file.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

use std::sync::Arc;

use anyhow::Context;

use crate::actions::{
    AssumeYes, ConsolePrompter, ExecutionOutcome, PolicyExecutor, Prompter, SystemBackend,
};
use crate::cache::HashCache;
use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::{classify_matches, group_by_hash, resolve_groups};
use crate::error::ExitCode;
use crate::progress::{Progress, ProgressCallback};
use crate::report::RunReport;
use crate::scanner::Scanner;

/// Run a full sweep from parsed CLI arguments.
///
/// Pipeline: configuration, cache, scan, grouping and resolution, policy
/// execution, cache maintenance, report.
///
/// # Errors
///
/// Configuration problems ([`config::ConfigError`]) and unusable cache
/// locations ([`cache::CacheError`]) abort the run. Everything after the
/// scan starts is reported per file and never fails the run.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    report::init_colors(cli.no_color);

    let config_path = config::find_config_file(cli.config.as_deref())?;
    let mut raw = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // CLI flags layer above the file and environment.
    if cli.dry_run {
        raw.general.dry_run = true;
    }
    if let Some(path) = &cli.cache {
        raw.general.cache_file = Some(path.clone());
    }
    let config = raw.compile()?;

    if config.dry_run {
        log::info!("Dry run: actions will be reported, not performed");
    }

    // The cache location must be usable before anything is scanned; the
    // snapshot itself may be missing or corrupt and starts empty.
    let cache_path = config
        .cache_file
        .clone()
        .or_else(config::default_cache_path);
    let cache = match &cache_path {
        Some(path) => HashCache::open(path)?,
        None => {
            log::warn!("No cache location available; every file will be hashed");
            HashCache::new()
        }
    };

    let shutdown = signal::install_handler()?;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(cli.quiet));

    let scan = Scanner::new(&config, &cache)
        .with_shutdown_flag(shutdown.get_flag())
        .with_progress(Arc::clone(&progress))
        .scan();

    let (groups, grouping) = group_by_hash(&scan.records);
    let resolutions = resolve_groups(&groups, &scan.records, &config.directories);
    let matches = classify_matches(&scan.records, &config.directories);

    let mut execution = ExecutionOutcome::default();
    if scan.interrupted {
        log::info!("Scan interrupted; no actions applied");
        execution.interrupted = true;
    } else {
        let prompter: Box<dyn Prompter> = if cli.yes {
            Box::new(AssumeYes)
        } else {
            Box::new(ConsolePrompter::new())
        };
        let backend = SystemBackend;
        execution = PolicyExecutor::new(&config, &cache, &backend, prompter.as_ref())
            .with_shutdown_flag(shutdown.get_flag())
            .with_progress(Arc::clone(&progress))
            .execute(&scan.records, &groups, &resolutions, &matches);
    }
    let interrupted = scan.interrupted || execution.interrupted;

    // The cache persists even after an interrupt so finished hash work is
    // kept; pruning is skipped because unvisited files are not stale.
    if let Some(path) = &cache_path {
        if interrupted {
            log::debug!("Skipping cache prune after interruption");
        } else {
            let pruned = cache.prune();
            if pruned > 0 {
                log::debug!("Pruned {pruned} stale cache entries");
            }
        }
        cache.persist(path)?;
    }

    let run_report = RunReport {
        scan: &scan.stats,
        scan_errors: scan.errors.len(),
        grouping: &grouping,
        execution: &execution,
        dry_run: config.dry_run,
    };
    if !cli.quiet {
        let mut stdout = std::io::stdout().lock();
        if let Err(error) = run_report.render(&mut stdout) {
            log::warn!("Failed to render report: {error}");
        }
    }
    if let Some(path) = &cli.report_csv {
        match run_report.save_csv(path) {
            Ok(()) => {}
            Err(error) => log::error!("Failed to write {}: {error}", path.display()),
        }
    }

    if interrupted {
        return Ok(ExitCode::Interrupted);
    }
    Ok(ExitCode::Success)
}
