//! # Design
//!
//! - Centralize application-level errors for bootstrap and the run.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Per-invocation failures never reach this type; they live in the run summary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded, even from the default.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: hybrid7z_config::ConfigError,
    },
    /// Logging could not be initialised.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: hybrid7z_telemetry::TelemetryError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// None of the given entries is an existing directory.
    #[error("no valid target")]
    NoTargets {
        /// Number of entries that were rejected.
        rejected: usize,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: hybrid7z_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    /// Wrap a telemetry failure.
    pub const fn telemetry(
        operation: &'static str,
        source: hybrid7z_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) fn io(operation: &'static str, path: Option<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path,
            source,
        }
    }

    /// Process exit code reported for fatal errors.
    pub const EXIT_CODE: i32 = 2;

    /// One-line message including the source chain.
    #[must_use]
    pub fn display_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        match self {
            Self::Io {
                operation,
                path: Some(path),
                ..
            } => format!("{message} ({operation} {})", path.display()),
            Self::Io { operation, .. }
            | Self::Config { operation, .. }
            | Self::Telemetry { operation, .. } => format!("{message} ({operation})"),
            Self::NoTargets { rejected } => format!("{message} ({rejected} entries skipped)"),
        }
    }
}
