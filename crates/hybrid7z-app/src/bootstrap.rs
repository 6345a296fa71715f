//! Boot sequence for one `hybrid7z` run.
//!
//! # Design
//! - Configuration problems degrade to the default configuration; only an unusable default aborts.
//! - Targets come from the command line followed by the batch file, in that order.
//! - Per-invocation failures are reported through [`RunStatus`], never as errors.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hybrid7z_config::{ConfigOrigin, Hybrid7zConfig, load_or_default};
use hybrid7z_phase::{
    Archiver, FILTER_LIST_SUFFIX, Hybrid7zPipeline, SUMMARY_FILE_NAME, resolve_targets,
};
use hybrid7z_telemetry::record_target_count;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus {
    /// Whether any archiver invocation failed.
    pub any_failed: bool,
    /// Number of targets that were archived.
    pub targets: usize,
    /// Location of the JSON run summary, when it could be written.
    pub summary_path: Option<PathBuf>,
}

impl RunStatus {
    /// Process exit code for this run.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.any_failed { 1 } else { 0 }
    }
}

/// Run Hybrid7z with the real archiver process.
///
/// # Errors
///
/// Returns an error when no usable configuration exists, the batch file cannot
/// be read, or no target survives resolution.
pub async fn run_app(cli: &Cli) -> AppResult<RunStatus> {
    run_with_archiver(cli, None).await
}

/// Run Hybrid7z, optionally replacing the archiver implementation.
///
/// # Errors
///
/// See [`run_app`].
pub async fn run_with_archiver(
    cli: &Cli,
    archiver: Option<Arc<dyn Archiver>>,
) -> AppResult<RunStatus> {
    let loaded = load_or_default(&cli.config).map_err(|err| AppError::config("config.load", err))?;
    if let ConfigOrigin::FallbackDefault { backup } = &loaded.origin {
        warn!(backup = %backup.display(), "running with the default configuration");
    }
    let config = loaded.config;
    warn_unsupported(&config);

    let entries = collect_entries(cli).await?;
    let targets = resolve_targets(entries.iter(), config.misc.include_root_folder);
    if targets.is_empty() {
        return Err(AppError::NoTargets {
            rejected: entries.len(),
        });
    }
    record_target_count(targets.len());
    for target in &targets {
        debug!(
            source = %target.source().display(),
            destination = %target.destination().display(),
            password = target.password().is_some(),
            "target accepted"
        );
    }
    info!(
        accepted = targets.len(),
        skipped = entries.len() - targets.len(),
        "targets resolved"
    );

    let log_folder = cli
        .log_folder
        .clone()
        .unwrap_or_else(|| config.archiver.log_folder.clone());
    let delete_filter_cache = config.misc.delete_filter_cache;
    let stale_suffixes = stale_list_suffixes(&config);

    let mut pipeline = Hybrid7zPipeline::new(config, &cli.filter_folder, &log_folder);
    if let Some(archiver) = archiver {
        pipeline = pipeline.with_archiver(archiver);
    }
    remove_stale_filter_lists(pipeline.filter_folder(), &stale_suffixes).await;
    let report = pipeline.run(&targets).await;

    report.summary.log();
    let summary_path = log_folder.join(SUMMARY_FILE_NAME);
    let summary_path = match report.summary.write_json(&summary_path) {
        Ok(()) => Some(summary_path),
        Err(err) => {
            warn!(error = %err, detail = ?err, "failed to write run summary");
            None
        }
    };

    if delete_filter_cache {
        let removed = report.partition.delete_generated();
        info!(removed, "filter cache deleted");
    }

    Ok(RunStatus {
        any_failed: report.summary.any_failed,
        targets: targets.len(),
        summary_path,
    })
}

/// Wait for the enter key unless pausing is disabled or stdin is not interactive.
pub async fn pause(cli: &Cli) {
    if cli.no_pause || !std::io::stdin().is_terminal() {
        return;
    }
    eprintln!("Press enter to exit...");
    let mut line = String::new();
    if let Err(err) = BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
        warn!(error = %err, "failed to read from stdin");
    }
}

fn warn_unsupported(config: &Hybrid7zConfig) {
    if config.misc.delete_archived_path {
        warn!("delete_archived_path is not supported; archived sources are kept");
    }
}

/// Command-line targets followed by the non-blank lines of the batch file.
async fn collect_entries(cli: &Cli) -> AppResult<Vec<String>> {
    let mut entries = cli.targets.clone();
    if let Some(batch) = &cli.batch {
        let text = tokio::fs::read_to_string(batch)
            .await
            .map_err(|source| AppError::io("batch.read", Some(batch.clone()), source))?;
        entries.extend(parse_batch(&text));
    }
    Ok(entries)
}

fn parse_batch(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

fn stale_list_suffixes(config: &Hybrid7zConfig) -> Vec<String> {
    config
        .phase_names()
        .map(|phase| format!(".{phase}.{FILTER_LIST_SUFFIX}"))
        .collect()
}

/// Delete filter lists left behind by an earlier, interrupted run.
async fn remove_stale_filter_lists(folder: &Path, suffixes: &[String]) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(folder).await else {
        return 0;
    };
    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(folder = %folder.display(), error = %err, "failed to scan filter folder");
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "failed to delete stale filter list");
            }
        }
    }
    if removed > 0 {
        info!(removed, folder = %folder.display(), "deleted stale filter lists");
    }
    removed
}
