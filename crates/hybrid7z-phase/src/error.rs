//! # Design
//!
//! - Provide structured, constant-message errors for the partition and archiver pipeline.
//! - Capture operation context (paths, patterns, executables) so failures are reproducible in tests.
//! - Per-item errors are logged and folded by callers; they never abort a run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for phase operations.
pub type PhaseResult<T> = Result<T, PhaseError>;

/// Errors produced while partitioning targets or running archiver phases.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// IO failures while interacting with the filesystem.
    #[error("phase io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures.
    #[error("phase walkdir failure")]
    Walkdir {
        /// Operation that triggered the traversal failure.
        operation: &'static str,
        /// Root of the traversal.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Filter pattern compilation failures.
    #[error("phase glob failure")]
    Glob {
        /// Operation that triggered the glob failure.
        operation: &'static str,
        /// Pattern that failed to compile.
        pattern: String,
        /// Underlying globset error.
        source: globset::Error,
    },
    /// The archiver process could not be started.
    #[error("archiver launch failure")]
    ArchiverLaunch {
        /// Executable that failed to start.
        executable: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A blocking or spawned task failed to complete.
    #[error("phase task failure")]
    Join {
        /// Operation the task was running.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
    /// Summary serialization failures.
    #[error("phase json failure")]
    Json {
        /// Operation that triggered the JSON failure.
        operation: &'static str,
        /// Path involved in the JSON failure.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl PhaseError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn glob(
        operation: &'static str,
        pattern: String,
        source: globset::Error,
    ) -> Self {
        Self::Glob {
            operation,
            pattern,
            source,
        }
    }

    pub(crate) const fn join(operation: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Join { operation, source }
    }
}
