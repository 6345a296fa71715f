//! Typed configuration models.
//!
//! # Design
//! - `RawConfig` mirrors the TOML document one-to-one and is only used while parsing.
//! - `Hybrid7zConfig` is the resolved, immutable value the rest of the workspace reads.
//! - Per-phase lookups are plain field accesses; nothing re-queries the document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::validate::{validate_archiver, validate_phase_list};

#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    archiver: RawArchiver,
    phase: RawPhase,
    #[serde(default)]
    misc: MiscSettings,
}

#[derive(Debug, Deserialize)]
struct RawArchiver {
    executable: String,
    #[serde(default)]
    parameters: String,
    #[serde(default)]
    password_parameter: String,
    #[serde(default = "default_log_folder")]
    log_folder: String,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    phase_list: Vec<String>,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
    #[serde(default)]
    parallel: BTreeMap<String, bool>,
    #[serde(default)]
    archiver_override: BTreeMap<String, String>,
}

fn default_log_folder() -> String {
    "logs".to_string()
}

/// Archiver settings shared by every phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverSettings {
    /// Global archiver executable used when a phase has no override.
    pub executable: PathBuf,
    /// Arguments placed before the phase parameters on every invocation.
    pub parameters: String,
    /// Password argument template containing the `{Password}` token.
    pub password_parameter: String,
    /// Folder that receives archiver STDOUT/STDERR logs.
    pub log_folder: PathBuf,
}

/// Settings resolved for one declared phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSettings {
    /// Phase name; also the stem of its filter file.
    pub name: String,
    /// Phase-specific archiver arguments.
    pub parameters: String,
    /// Whether the phase may run once per target concurrently across all targets.
    pub parallel: bool,
    /// Archiver executable used for this phase only.
    pub executable_override: Option<PathBuf>,
}

/// Miscellaneous run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MiscSettings {
    /// Record the target directory itself as the archive root.
    #[serde(default)]
    pub include_root_folder: bool,
    /// Move archived sources away after a successful run.
    #[serde(default)]
    pub delete_archived_path: bool,
    /// Delete generated filter lists after a successful run.
    #[serde(default)]
    pub delete_filter_cache: bool,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hybrid7zConfig {
    /// Archiver settings.
    pub archiver: ArchiverSettings,
    /// Phases in declared order; the last one is terminal.
    pub phases: Vec<PhaseSettings>,
    /// Miscellaneous switches.
    pub misc: MiscSettings,
}

impl Hybrid7zConfig {
    /// Parse and validate a TOML configuration document.
    ///
    /// `origin` is only used to label parse errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::InvalidField`] when validation fails.
    pub fn from_toml_str(text: &str, origin: &Path) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> ConfigResult<Self> {
        let RawConfig {
            archiver,
            phase,
            misc,
        } = raw;

        validate_archiver(&archiver.executable)?;
        validate_phase_list(&phase.phase_list)?;

        let RawPhase {
            phase_list,
            mut parameters,
            parallel,
            mut archiver_override,
        } = phase;

        let phases = phase_list
            .into_iter()
            .map(|name| {
                let phase_parameters = parameters.remove(&name).unwrap_or_else(|| {
                    debug!(phase = %name, "no phase parameters configured");
                    String::new()
                });
                let executable_override = archiver_override
                    .remove(&name)
                    .filter(|exe| !exe.trim().is_empty())
                    .map(PathBuf::from);
                PhaseSettings {
                    parallel: parallel.get(&name).copied().unwrap_or(false),
                    parameters: phase_parameters,
                    executable_override,
                    name,
                }
            })
            .collect();

        Ok(Self {
            archiver: ArchiverSettings {
                executable: PathBuf::from(archiver.executable.trim()),
                parameters: archiver.parameters,
                password_parameter: archiver.password_parameter,
                log_folder: PathBuf::from(archiver.log_folder),
            },
            phases,
            misc,
        })
    }

    /// Look up the settings of a declared phase.
    #[must_use]
    pub fn phase(&self, name: &str) -> Option<&PhaseSettings> {
        self.phases.iter().find(|phase| phase.name == name)
    }

    /// Archiver executable for a phase: its override, else the global executable.
    #[must_use]
    pub fn archiver_executable(&self, phase: &str) -> &Path {
        self.phase(phase)
            .and_then(|settings| settings.executable_override.as_deref())
            .unwrap_or(&self.archiver.executable)
    }

    /// Phase-specific archiver parameters (empty for unknown phases).
    #[must_use]
    pub fn phase_parameters(&self, phase: &str) -> &str {
        self.phase(phase)
            .map_or("", |settings| settings.parameters.as_str())
    }

    /// Whether a phase runs concurrently across targets.
    #[must_use]
    pub fn is_phase_parallel(&self, phase: &str) -> bool {
        self.phase(phase).is_some_and(|settings| settings.parallel)
    }

    /// Names of the declared phases in order.
    pub fn phase_names(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|phase| phase.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DEFAULT_CONFIG;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn default_document_resolves_all_phases() -> TestResult<()> {
        let config = Hybrid7zConfig::from_toml_str(DEFAULT_CONFIG, Path::new("default.toml"))?;
        assert_eq!(
            config.phase_names().collect::<Vec<_>>(),
            vec!["PPMd", "Copy", "x86", "LZMA2"]
        );
        assert!(config.is_phase_parallel("PPMd"));
        assert!(config.is_phase_parallel("Copy"));
        assert!(!config.is_phase_parallel("LZMA2"));
        assert_eq!(config.archiver_executable("LZMA2"), Path::new("7z"));
        assert_eq!(config.archiver.password_parameter, "-p{Password}");
        assert!(config.misc.delete_filter_cache);
        assert!(!config.misc.include_root_folder);
        Ok(())
    }

    #[test]
    fn overrides_and_missing_entries_resolve_to_defaults() -> TestResult<()> {
        let document = r#"
            [archiver]
            executable = "7z"

            [phase]
            phase_list = ["Fast", "Bulk"]

            [phase.parameters]
            Bulk = "-mx=9"

            [phase.archiver_override]
            Fast = "/opt/7zz"
        "#;
        let config = Hybrid7zConfig::from_toml_str(document, Path::new("inline.toml"))?;
        assert_eq!(config.archiver_executable("Fast"), Path::new("/opt/7zz"));
        assert_eq!(config.archiver_executable("Bulk"), Path::new("7z"));
        assert_eq!(config.phase_parameters("Fast"), "");
        assert_eq!(config.phase_parameters("Bulk"), "-mx=9");
        assert!(!config.is_phase_parallel("Fast"));
        assert_eq!(config.archiver.log_folder, PathBuf::from("logs"));
        assert_eq!(config.misc, MiscSettings::default());
        Ok(())
    }

    #[test]
    fn malformed_document_reports_parse_error() {
        let result = Hybrid7zConfig::from_toml_str("[archiver", Path::new("broken.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_archiver_section_is_a_parse_error() {
        let document = r#"
            [phase]
            phase_list = ["Only"]
        "#;
        let result = Hybrid7zConfig::from_toml_str(document, Path::new("partial.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
