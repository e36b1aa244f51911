//! Progress reporting using indicatif.
//!
//! The pipeline reports through the [`ProgressCallback`] trait so the
//! library stays silent by default; the CLI installs [`Progress`] to draw a
//! spinner for the walk, a bar for hashing, and a bar for applying actions.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Callback for pipeline phase updates.
///
/// Phases are named `"walk"`, `"hash"`, and `"apply"`.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts with the number of items it will process.
    /// The walk phase passes zero; its total is unknown up front.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called per item with the running count and the path being processed.
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item finishes, with its size in bytes.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called with a short status message for the active phase.
    fn on_message(&self, _message: &str) {}
}

/// Terminal progress bars for the three pipeline phases.
pub struct Progress {
    multi: MultiProgress,
    walk: Mutex<Option<ProgressBar>>,
    hash: Mutex<Option<ProgressBar>>,
    apply: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a reporter; `quiet` suppresses all drawing.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walk: Mutex::new(None),
            hash: Mutex::new(None),
            apply: Mutex::new(None),
            quiet,
        }
    }

    fn walk_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn hash_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn apply_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        for slot in [&self.apply, &self.hash, &self.walk] {
            if let Some(pb) = slot.lock().unwrap().as_ref() {
                return Some(pb.clone());
            }
        }
        None
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            "walk" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walk_style());
                pb.set_message("Scanning directories");
                pb.enable_steady_tick(Duration::from_millis(100));
                *self.walk.lock().unwrap() = Some(pb);
            }
            "hash" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::hash_style());
                pb.set_message("Hashing");
                *self.hash.lock().unwrap() = Some(pb);
            }
            "apply" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::apply_style());
                pb.set_message("Applying actions");
                *self.apply.lock().unwrap() = Some(pb);
            }
            _ => {}
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active_bar() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let (slot, done) = match phase {
            "walk" => (&self.walk, "Scan complete"),
            "hash" => (&self.hash, "Hashing complete"),
            "apply" => (&self.apply, "Actions applied"),
            _ => return,
        };
        if let Some(pb) = slot.lock().unwrap().take() {
            pb.finish_with_message(done);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active_bar() {
            pb.set_message(message.to_string());
        }
    }
}

/// Shorten a path to its trailing component for bar messages.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let keep = max_len.saturating_sub(3).max(1);
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(keep))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
