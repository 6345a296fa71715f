//! Run-level span helpers.
//!
//! # Design
//! - One process-wide `run` span carries the version so every event inherits it.

use tracing::{Span, span::Entered};

use crate::init::version;

/// Guard that keeps the run-level tracing span entered for the lifetime of the process.
pub struct RunContextGuard {
    _guard: Entered<'static>,
}

impl RunContextGuard {
    /// Enter the run-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(run: impl Into<String>) -> Self {
        let run = run.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "run",
            run = %run,
            version = %version(),
            targets = tracing::field::Empty
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record the number of accepted targets on the active run span.
pub fn record_target_count(count: usize) {
    Span::current().record("targets", count);
}
