//! Validation helpers for configuration documents.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn validate_archiver(executable: &str) -> ConfigResult<()> {
    if executable.trim().is_empty() {
        return Err(ConfigError::invalid(
            "archiver",
            "executable",
            "empty",
            Some(executable.to_string()),
        ));
    }
    Ok(())
}

pub(crate) fn validate_phase_list(phases: &[String]) -> ConfigResult<()> {
    if phases.is_empty() {
        return Err(ConfigError::invalid("phase", "phase_list", "empty", None));
    }

    let mut seen = HashSet::with_capacity(phases.len());
    for name in phases {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "phase",
                "phase_list",
                "empty_name",
                Some(name.clone()),
            ));
        }
        // Phase names become file names for filter files and logs.
        if name.contains(['/', '\\']) {
            return Err(ConfigError::invalid(
                "phase",
                "phase_list",
                "path_separator",
                Some(name.clone()),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::invalid(
                "phase",
                "phase_list",
                "duplicate",
                Some(name.clone()),
            ));
        }
    }
    Ok(())
}
