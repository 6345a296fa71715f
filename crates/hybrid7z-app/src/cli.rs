//! Command-line surface of the `hybrid7z` binary.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use hybrid7z_config::DEFAULT_CONFIG_FILE_NAME;
use hybrid7z_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};

/// File mirroring the console log, placed next to the configuration file.
pub const LOG_FILE_NAME: &str = "hybrid7z.log";

/// Compress directories into 7z archives, routing files through ordered phases.
#[derive(Debug, Clone, Parser)]
#[command(name = "hybrid7z", version, about)]
pub struct Cli {
    /// Directories to archive, or `source|destination|password` entries.
    pub targets: Vec<String>,

    /// Configuration file; written from the default when missing.
    #[arg(
        short = 'c',
        long = "config",
        visible_alias = "cfg",
        env = "HYBRID7Z_CONFIG",
        default_value = DEFAULT_CONFIG_FILE_NAME
    )]
    pub config: PathBuf,

    /// Folder receiving archiver logs; overrides `archiver.log_folder`.
    #[arg(short = 'l', long = "log-folder", visible_aliases = ["logdir", "logroot"])]
    pub log_folder: Option<PathBuf>,

    /// File with one target entry per line.
    #[arg(short = 'b', long = "batch")]
    pub batch: Option<PathBuf>,

    /// Folder holding `<phase>.txt` filter files; generated filter lists are written here.
    #[arg(short = 'f', long = "filter-folder", default_value = ".")]
    pub filter_folder: PathBuf,

    /// Exit without waiting for a key press.
    #[arg(short = 'y', long = "no-pause", visible_aliases = ["yesall", "nobreak"])]
    pub no_pause: bool,

    /// Log level filter; `RUST_LOG` takes precedence.
    #[arg(long, env = "HYBRID7Z_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Console log format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Mirror every log event into this file instead of `hybrid7z.log` next to the config.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Console log format choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Log file used for this run.
    #[must_use]
    pub fn log_file_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            self.config
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .join(LOG_FILE_NAME)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn defaults_apply_without_options() -> TestResult<()> {
        let cli = Cli::try_parse_from(["hybrid7z", "/data/album"])?;
        assert_eq!(cli.targets, vec!["/data/album"]);
        assert_eq!(cli.filter_folder, PathBuf::from("."));
        assert!(!cli.no_pause);
        assert_eq!(cli.log_format, LogFormatArg::Pretty);
        assert_eq!(cli.log_file_path(), PathBuf::from(".").join(LOG_FILE_NAME));
        Ok(())
    }

    #[test]
    fn aliases_are_accepted() -> TestResult<()> {
        let cli = Cli::try_parse_from([
            "hybrid7z",
            "--cfg",
            "/etc/hybrid7z/custom.toml",
            "--logroot",
            "/var/log/h7z",
            "--nobreak",
            "--batch",
            "targets.txt",
            "a|b.7z|pw",
        ])?;
        assert_eq!(cli.config, PathBuf::from("/etc/hybrid7z/custom.toml"));
        assert_eq!(cli.log_folder, Some(PathBuf::from("/var/log/h7z")));
        assert!(cli.no_pause);
        assert_eq!(cli.batch, Some(PathBuf::from("targets.txt")));
        assert_eq!(cli.targets, vec!["a|b.7z|pw"]);
        assert_eq!(
            cli.log_file_path(),
            PathBuf::from("/etc/hybrid7z").join(LOG_FILE_NAME)
        );
        Ok(())
    }

    #[test]
    fn short_flags_and_json_format() -> TestResult<()> {
        let cli = Cli::try_parse_from([
            "hybrid7z",
            "-y",
            "-f",
            "filters",
            "-l",
            "logs",
            "--log-format",
            "json",
        ])?;
        assert!(cli.no_pause);
        assert_eq!(cli.filter_folder, PathBuf::from("filters"));
        assert_eq!(LogFormat::from(cli.log_format), LogFormat::Json);
        assert!(cli.targets.is_empty());
        Ok(())
    }

    #[test]
    fn help_is_reported_as_display_help() {
        let result = Cli::try_parse_from(["hybrid7z", "--help"]);
        assert!(matches!(
            result.map_err(|err| err.kind()),
            Err(clap::error::ErrorKind::DisplayHelp)
        ));
    }
}
