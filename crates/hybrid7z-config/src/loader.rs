//! Configuration file loading with default-file fallback.
//!
//! # Design
//! - A missing file is replaced by the embedded default before loading.
//! - A file that fails to load is kept as `<file>.bak` and replaced by the default.
//! - Only a failing default aborts the run; everything else degrades to defaults.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::defaults::{BACKUP_SUFFIX, DEFAULT_CONFIG};
use crate::error::{ConfigError, ConfigResult};
use crate::model::Hybrid7zConfig;

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The existing file loaded cleanly.
    File,
    /// No file existed; the default was written and loaded.
    CreatedDefault,
    /// The existing file failed; it was moved to `backup` and the default loaded instead.
    FallbackDefault {
        /// Location of the preserved, failing configuration.
        backup: PathBuf,
    },
}

/// Configuration together with the way it was obtained.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved configuration.
    pub config: Hybrid7zConfig,
    /// Origin of the configuration.
    pub origin: ConfigOrigin,
}

/// Read and resolve a configuration file.
///
/// # Errors
///
/// Returns an error when the file cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> ConfigResult<Hybrid7zConfig> {
    let text =
        fs::read_to_string(path).map_err(|source| ConfigError::io("config.read", path, source))?;
    Hybrid7zConfig::from_toml_str(&text, path)
}

/// Write the embedded default configuration to `path`, creating parent folders.
///
/// # Errors
///
/// Returns an error if the folder or file cannot be written.
pub fn write_default_config(path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| ConfigError::io("config.create_parent", parent, source))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .map_err(|source| ConfigError::io("config.write_default", path, source))
}

/// Load `path`, writing or falling back to the default configuration as needed.
///
/// # Errors
///
/// Returns [`ConfigError::DefaultUnusable`] when the default configuration
/// itself cannot be loaded, and IO errors raised while writing it.
pub fn load_or_default(path: &Path) -> ConfigResult<LoadedConfig> {
    info!(path = %path.display(), "loading configuration");

    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; writing default configuration"
        );
        write_default_config(path)?;
        let config = load_default(path)?;
        return Ok(LoadedConfig {
            config,
            origin: ConfigOrigin::CreatedDefault,
        });
    }

    match load_config(path) {
        Ok(config) => Ok(LoadedConfig {
            config,
            origin: ConfigOrigin::File,
        }),
        Err(err) => {
            error!(
                error = %err,
                detail = ?err,
                path = %path.display(),
                "configuration failed to load; falling back to default configuration"
            );
            let backup = backup_path(path);
            fs::rename(path, &backup)
                .map_err(|source| ConfigError::io("config.backup", &backup, source))?;
            write_default_config(path)?;
            let config = load_default(path)?;
            warn!(backup = %backup.display(), "previous configuration preserved");
            Ok(LoadedConfig {
                config,
                origin: ConfigOrigin::FallbackDefault { backup },
            })
        }
    }
}

fn load_default(path: &Path) -> ConfigResult<Hybrid7zConfig> {
    load_config(path).map_err(|source| ConfigError::DefaultUnusable {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}
