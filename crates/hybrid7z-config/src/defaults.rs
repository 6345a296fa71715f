//! Default file names and the embedded default configuration document.

/// File name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "hybrid7z.toml";

/// Default configuration written when no configuration file exists.
pub const DEFAULT_CONFIG: &str = include_str!("../assets/default.toml");

/// Suffix appended to a configuration file that failed to load.
pub(crate) const BACKUP_SUFFIX: &str = ".bak";
