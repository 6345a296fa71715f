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

//! Hybrid7z application wiring.
//!
//! Layout: `cli.rs` (argument parsing), `bootstrap.rs` (run sequence), `error.rs`.

/// Run sequence: configuration, targets, pipeline and cleanup.
pub mod bootstrap;
/// Command-line arguments.
pub mod cli;
/// Application error type.
pub mod error;

pub use bootstrap::{RunStatus, pause, run_app, run_with_archiver};
pub use cli::{Cli, LOG_FILE_NAME, LogFormatArg};
pub use error::{AppError, AppResult};
