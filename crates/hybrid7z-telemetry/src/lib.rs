#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, unused)]
#![allow(clippy::module_name_repetitions)]

//! Logging primitives shared across the Hybrid7z workspace.
//!
//! Layout: `init.rs` (subscriber installation), `context.rs` (run span), `error.rs`.

pub mod context;
pub mod error;
pub mod init;

pub use context::{RunContextGuard, record_target_count};
pub use error::TelemetryError;
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging, version};
