//! Signal handling for graceful shutdown.
//!
//! Centralized Ctrl+C handling for the dupewarden run. A shared `AtomicBool`
//! flag is set when the signal arrives; the scanner stops dispatching new
//! hash work, the executor stops starting new actions, and the run still
//! prunes nothing, persists the cache, and exits with code 130.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupewarden::signal::install_handler;
//!
//! let handler = install_handler().expect("failed to install signal handler");
//! let flag = handler.get_flag();
//! // Pass `flag` to the scanner and executor; check it between units of work.
//! if handler.is_shutdown_requested() {
//!     // wind down
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag for coordinated termination.
///
/// Wraps an `AtomicBool` that is set when Ctrl+C is received. Clones share
/// the same flag; `get_flag` hands the raw `Arc` to worker threads.
#[derive(Debug, Clone)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with the flag initially unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown (used by tests and the signal hook).
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the underlying flag for passing to worker threads.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reset the flag to `false`. Lets tests reuse the process-wide handler.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install a Ctrl+C handler that sets the shutdown flag on interrupt.
///
/// Call once, early in startup. The OS-level hook can only be registered
/// once per process, so repeated calls (parallel tests driving `run_app`)
/// get the already-installed handler back with its flag reset; if another
/// component registered a hook first, an unhooked handler is returned so the
/// run can still be stopped via [`ShutdownHandler::request_shutdown`].
///
/// # Errors
///
/// Currently infallible in practice; the `Result` is kept for the
/// `ctrlc::Error` pathway should registration semantics change.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing in-flight work...");
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(handler)
        }
        Err(_) => {
            if let Some(handler) = GLOBAL_HANDLER.get() {
                handler.reset();
                Ok(handler.clone())
            } else {
                log::debug!("Ctrl+C handler already registered, using unhooked handler");
                let fallback = ShutdownHandler::new();
                let _ = GLOBAL_HANDLER.set(fallback.clone());
                Ok(fallback)
            }
        }
    }
}
