//! Exit codes for the application shell.

/// Exit codes for the dupewarden application.
///
/// A run that reaches the report is a success even when individual file
/// actions failed; per-file failures are counted, not fatal.
/// - 0: Success (run completed; per-file failures may be reported)
/// - 1: Configuration error (bad config file, unknown policy, missing directory)
/// - 2: Cache error (cache location unusable for rewrite)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success: the run completed and the report was produced.
    Success = 0,
    /// Configuration error: aborted before any scan.
    ConfigError = 1,
    /// Cache error: the persisted cache location cannot be rewritten.
    CacheError = 2,
    /// Interrupted: the run was stopped by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix used in error output.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DW000",
            Self::ConfigError => "DW001",
            Self::CacheError => "DW002",
            Self::Interrupted => "DW130",
        }
    }
}
