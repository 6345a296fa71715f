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

//! TOML-backed run configuration for Hybrid7z.
//!
//! Layout: `model.rs` (typed configuration), `validate.rs` (field checks),
//! `loader.rs` (file loading and default fallback), `defaults.rs` (embedded default).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use defaults::{DEFAULT_CONFIG, DEFAULT_CONFIG_FILE_NAME};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigOrigin, LoadedConfig, load_config, load_or_default, write_default_config};
pub use model::{ArchiverSettings, Hybrid7zConfig, MiscSettings, PhaseSettings};
