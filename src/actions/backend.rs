//! Filesystem mutation backend.
//!
//! # Overview
//!
//! Every destructive filesystem operation goes through the [`FsBackend`]
//! trait so policy execution can be tested against recording or failing
//! implementations. [`SystemBackend`] is the production implementation:
//! `std::fs` for stat/link/remove and the `trash` crate for recoverable
//! deletion.
//!
//! Hardlinking uses replace semantics: the link is created under a temporary
//! name next to the duplicate and then renamed over it, so the duplicate's
//! path never dangles even if the process dies mid-operation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

/// Error type for backend operations.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Target was not found (may have been deleted or moved since the scan).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied for the requested operation.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The platform trash service rejected the file.
    #[error("trash operation failed for {path}: {message}")]
    Trash { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Trash { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// Outcome of a hardlink request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The duplicate now shares storage with the kept file.
    Linked,
    /// The filesystem cannot link these paths (cross-device, no link
    /// support); the caller should fall back to another action.
    Unsupported,
}

/// Filesystem operations needed by policy execution.
///
/// Implementations must be safe to call from multiple worker threads.
pub trait FsBackend: Send + Sync {
    /// Return the current size and modification time of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the path is missing or unreadable.
    fn stat(&self, path: &Path) -> Result<(u64, SystemTime), ActionError>;

    /// Replace `duplicate` with a hardlink to `kept`.
    ///
    /// The duplicate keeps its path and name. Returns
    /// [`LinkStatus::Unsupported`] when the filesystem cannot link the two
    /// paths; the duplicate is left untouched in that case.
    ///
    /// # Errors
    ///
    /// Returns an error when either path is missing or the link or rename
    /// fails for a reason other than missing link support.
    fn hardlink(&self, kept: &Path, duplicate: &Path) -> Result<LinkStatus, ActionError>;

    /// Move `path` to the platform trash/recycle bin.
    ///
    /// # Errors
    ///
    /// Returns an error when the path is missing or the trash service
    /// rejects it.
    fn trash(&self, path: &Path) -> Result<(), ActionError>;

    /// Permanently remove `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the path is missing or cannot be removed.
    fn delete(&self, path: &Path) -> Result<(), ActionError>;
}

/// Production backend over `std::fs` and the `trash` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBackend;

impl FsBackend for SystemBackend {
    fn stat(&self, path: &Path) -> Result<(u64, SystemTime), ActionError> {
        let metadata = fs::metadata(path).map_err(|source| map_io(path, source))?;
        let modified = metadata
            .modified()
            .map_err(|source| map_io(path, source))?;
        Ok((metadata.len(), modified))
    }

    fn hardlink(&self, kept: &Path, duplicate: &Path) -> Result<LinkStatus, ActionError> {
        let tmp = link_temp_name(duplicate);

        match fs::hard_link(kept, &tmp) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                // A leftover temp link from an interrupted run blocks the name.
                fs::remove_file(&tmp).map_err(|source| map_io(&tmp, source))?;
                match fs::hard_link(kept, &tmp) {
                    Ok(()) => {}
                    Err(error) => return classify_link_error(kept, error),
                }
            }
            Err(error) => return classify_link_error(kept, error),
        }

        // Windows refuses to rename over an existing file.
        #[cfg(windows)]
        if duplicate.exists() {
            if let Err(source) = fs::remove_file(duplicate) {
                let _ = fs::remove_file(&tmp);
                return Err(map_io(duplicate, source));
            }
        }

        if let Err(source) = fs::rename(&tmp, duplicate) {
            let _ = fs::remove_file(&tmp);
            return Err(map_io(duplicate, source));
        }

        log::debug!(
            "Hardlinked {} -> {}",
            duplicate.display(),
            kept.display()
        );
        Ok(LinkStatus::Linked)
    }

    fn trash(&self, path: &Path) -> Result<(), ActionError> {
        // Stat first so a missing file reports as NotFound rather than an
        // opaque trash-service error.
        fs::metadata(path).map_err(|source| map_io(path, source))?;

        trash::delete(path).map_err(|error| {
            log::error!("Trash operation failed for {}: {error}", path.display());
            ActionError::Trash {
                path: path.to_path_buf(),
                message: error.to_string(),
            }
        })?;

        log::debug!("Moved to trash: {}", path.display());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), ActionError> {
        fs::remove_file(path).map_err(|source| map_io(path, source))?;
        log::debug!("Permanently deleted: {}", path.display());
        Ok(())
    }
}

/// Temp name used while building a replacement hardlink.
fn link_temp_name(duplicate: &Path) -> PathBuf {
    let mut name = duplicate.as_os_str().to_os_string();
    name.push(".dwlink");
    PathBuf::from(name)
}

fn map_io(path: &Path, source: io::Error) -> ActionError {
    match source.kind() {
        io::ErrorKind::NotFound => ActionError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ActionError::PermissionDenied(path.to_path_buf()),
        _ => ActionError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

fn classify_link_error(kept: &Path, error: io::Error) -> Result<LinkStatus, ActionError> {
    match error.kind() {
        // EXDEV, ENOTSUP and EPERM all mean the filesystem will not link
        // these paths; the caller falls over to trash instead.
        io::ErrorKind::CrossesDevices
        | io::ErrorKind::Unsupported
        | io::ErrorKind::PermissionDenied => {
            log::debug!("Hardlink unsupported for {}: {error}", kept.display());
            Ok(LinkStatus::Unsupported)
        }
        io::ErrorKind::NotFound => Err(ActionError::NotFound(kept.to_path_buf())),
        _ => Err(ActionError::Io {
            path: kept.to_path_buf(),
            source: error,
        }),
    }
}
