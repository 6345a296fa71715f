//! Run-level aggregation of invocation outcomes and compression ratios.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archiver::{InvocationOutcome, InvocationStatus};
use crate::error::{PhaseError, PhaseResult};

/// File name of the serialized run summary inside the log folder.
pub const SUMMARY_FILE_NAME: &str = "run-summary.json";

const DECIMAL_SUFFIXES: [&str; 9] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const BINARY_SUFFIXES: [&str; 9] = [
    "bytes", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB",
];

/// One failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Phase name.
    pub phase: String,
    /// Target source directory.
    pub target: PathBuf,
    /// How the invocation ended.
    pub status: InvocationStatus,
}

/// Original size of a target against the size of its archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressionRatio {
    /// Label used in logs (target name or `(Overall)`).
    pub name: String,
    /// Total size of the files under the source.
    pub original_bytes: u64,
    /// Size of the archive; zero when it does not exist.
    pub compressed_bytes: u64,
}

impl CompressionRatio {
    /// Measure `source` against `archive`. Blocking.
    #[must_use]
    pub fn measure(name: impl Into<String>, source: &Path, archive: &Path) -> Self {
        let original_bytes = WalkDir::new(source)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry while sizing");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum();
        let compressed_bytes = fs::metadata(archive).map_or(0, |metadata| metadata.len());
        Self {
            name: name.into(),
            original_bytes,
            compressed_bytes,
        }
    }

    /// Sum of every ratio, labelled `(Overall)`.
    #[must_use]
    pub fn total<'a>(ratios: impl IntoIterator<Item = &'a Self>) -> Self {
        ratios.into_iter().fold(
            Self {
                name: "(Overall)".to_string(),
                original_bytes: 0,
                compressed_bytes: 0,
            },
            |mut total, ratio| {
                total.original_bytes = total.original_bytes.saturating_add(ratio.original_bytes);
                total.compressed_bytes = total
                    .compressed_bytes
                    .saturating_add(ratio.compressed_bytes);
                total
            },
        )
    }

    /// Archive size as a whole percentage of the original size.
    #[must_use]
    pub fn percent(&self) -> u64 {
        if self.original_bytes == 0 {
            return 0;
        }
        let percent = u128::from(self.compressed_bytes) * 100 / u128::from(self.original_bytes);
        u64::try_from(percent).unwrap_or(u64::MAX)
    }

    /// Log the ratio together with the saved or wasted amount.
    pub fn log(&self) {
        info!(
            name = %self.name,
            original_bytes = self.original_bytes,
            compressed_bytes = self.compressed_bytes,
            "{}: {} -> {} ({}% compressed)",
            self.name,
            size_suffix(self.original_bytes),
            size_suffix(self.compressed_bytes),
            self.percent()
        );
        if self.original_bytes > self.compressed_bytes {
            info!(
                "{}: saved {}",
                self.name,
                size_suffix(self.original_bytes - self.compressed_bytes)
            );
        } else {
            warn!(
                "{}: wasted {}",
                self.name,
                size_suffix(self.compressed_bytes - self.original_bytes)
            );
        }
    }
}

/// Render `bytes` in decimal and binary units: `(1.5 KB / 1.5 KiB)`.
#[must_use]
pub fn size_suffix(bytes: u64) -> String {
    format!(
        "({} / {})",
        scaled(bytes, 1000.0, &DECIMAL_SUFFIXES),
        scaled(bytes, 1024.0, &BINARY_SUFFIXES)
    )
}

#[allow(clippy::cast_precision_loss)]
fn scaled(bytes: u64, base: f64, suffixes: &[&str]) -> String {
    let last = suffixes.len() - 1;
    let mut size = bytes as f64;
    let mut magnitude = 0;
    while size >= base && magnitude < last {
        size /= base;
        magnitude += 1;
    }
    if (size * 10.0).round() / 10.0 >= 1000.0 && magnitude < last {
        size /= base;
        magnitude += 1;
    }
    format!("{size:.1} {}", suffixes[magnitude])
}

/// Folds invocation outcomes into a run summary.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    invocations: usize,
    failures: Vec<FailureRecord>,
    outcomes: Vec<InvocationOutcome>,
    ratios: Vec<CompressionRatio>,
}

impl ResultAggregator {
    /// Empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome.
    pub fn record(&mut self, outcome: InvocationOutcome) {
        self.invocations += 1;
        if outcome.failed() {
            self.failures.push(FailureRecord {
                phase: outcome.phase.clone(),
                target: outcome.target.clone(),
                status: outcome.status.clone(),
            });
        }
        self.outcomes.push(outcome);
    }

    /// Record an invocation whose task died before reporting.
    pub fn record_lost(&mut self, phase: &str, target: &Path, reason: String) {
        self.record(InvocationOutcome {
            phase: phase.to_string(),
            target: target.to_path_buf(),
            status: InvocationStatus::LaunchFailed { reason },
            stdout_log: None,
            stderr_log: None,
        });
    }

    /// Record the compression ratio of one target.
    pub fn record_ratio(&mut self, ratio: CompressionRatio) {
        ratio.log();
        self.ratios.push(ratio);
    }

    /// Whether any recorded invocation failed.
    #[must_use]
    pub fn any_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of recorded invocations.
    #[must_use]
    pub const fn invocations(&self) -> usize {
        self.invocations
    }

    /// Close the run.
    #[must_use]
    pub fn finish(self) -> RunSummary {
        let overall = (!self.ratios.is_empty()).then(|| CompressionRatio::total(&self.ratios));
        RunSummary {
            finished_at: Local::now(),
            invocations: self.invocations,
            any_failed: !self.failures.is_empty(),
            failures: self.failures,
            ratios: self.ratios,
            overall,
            outcomes: self.outcomes,
        }
    }
}

/// Final state of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// When the last invocation was folded in.
    pub finished_at: DateTime<Local>,
    /// Number of invocations started.
    pub invocations: usize,
    /// Whether any invocation failed.
    pub any_failed: bool,
    /// Failed invocations.
    pub failures: Vec<FailureRecord>,
    /// Per-target compression ratios.
    pub ratios: Vec<CompressionRatio>,
    /// Sum of every target ratio.
    pub overall: Option<CompressionRatio>,
    /// Every outcome in completion order.
    pub outcomes: Vec<InvocationOutcome>,
}

impl RunSummary {
    /// Log the aggregate result and each failure.
    pub fn log(&self) {
        if let Some(overall) = &self.overall {
            overall.log();
        }
        for failure in &self.failures {
            warn!(
                phase = %failure.phase,
                target = %failure.target.display(),
                status = ?failure.status,
                "invocation failed"
            );
        }
        if self.any_failed {
            warn!(
                invocations = self.invocations,
                failures = self.failures.len(),
                "run finished with errors; check the archiver logs"
            );
        } else {
            info!(invocations = self.invocations, "all operations completed successfully");
        }
    }

    /// Write the summary as pretty JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary cannot be serialized or written.
    pub fn write_json(&self, path: &Path) -> PhaseResult<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| PhaseError::Json {
            operation: "summary.serialize",
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| PhaseError::io("summary.create_folder", parent, source))?;
        }
        fs::write(path, json).map_err(|source| PhaseError::io("summary.write", path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::ExitCodeMeaning;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    fn outcome(phase: &str, status: InvocationStatus) -> InvocationOutcome {
        InvocationOutcome {
            phase: phase.to_string(),
            target: PathBuf::from("/data/album"),
            status,
            stdout_log: None,
            stderr_log: None,
        }
    }

    #[test]
    fn size_suffix_renders_both_units() {
        assert_eq!(size_suffix(0), "(0.0 bytes / 0.0 bytes)");
        assert_eq!(size_suffix(1536), "(1.5 KB / 1.5 KiB)");
        assert_eq!(size_suffix(1_048_576), "(1.0 MB / 1.0 MiB)");
        assert_eq!(size_suffix(999_999), "(1.0 MB / 976.6 KiB)");
    }

    #[test]
    fn aggregator_or_folds_failures() {
        let mut aggregator = ResultAggregator::new();
        aggregator.record(outcome("PPMd", InvocationStatus::Succeeded));
        assert!(!aggregator.any_failed());

        aggregator.record(outcome(
            "LZMA2",
            InvocationStatus::Exited {
                code: Some(2),
                meaning: Some(ExitCodeMeaning::FatalError),
            },
        ));
        aggregator.record(outcome("Copy", InvocationStatus::Succeeded));
        assert!(aggregator.any_failed());

        let summary = aggregator.finish();
        assert_eq!(summary.invocations, 3);
        assert!(summary.any_failed);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].phase, "LZMA2");
    }

    #[test]
    fn compression_ratio_measures_tree_and_archive() -> TestResult<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("album");
        fs::create_dir_all(source.join("nested"))?;
        fs::write(source.join("a.txt"), vec![b'a'; 600])?;
        fs::write(source.join("nested").join("b.bin"), vec![b'b'; 400])?;
        let archive = temp.path().join("album.7z");
        fs::write(&archive, vec![0_u8; 250])?;

        let ratio = CompressionRatio::measure("album", &source, &archive);
        assert_eq!(ratio.original_bytes, 1000);
        assert_eq!(ratio.compressed_bytes, 250);
        assert_eq!(ratio.percent(), 25);

        let missing = CompressionRatio::measure("album", &source, &temp.path().join("none.7z"));
        assert_eq!(missing.compressed_bytes, 0);

        let total = CompressionRatio::total([&ratio, &missing]);
        assert_eq!(total.original_bytes, 2000);
        assert_eq!(total.compressed_bytes, 250);
        Ok(())
    }

    #[test]
    fn summary_is_written_as_json() -> TestResult<()> {
        let temp = TempDir::new()?;
        let mut aggregator = ResultAggregator::new();
        aggregator.record_lost("PPMd", Path::new("/data/album"), "task panicked".to_string());
        let summary = aggregator.finish();
        let path = temp.path().join("logs").join(SUMMARY_FILE_NAME);

        summary.write_json(&path)?;

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;
        assert_eq!(value["any_failed"], serde_json::Value::Bool(true));
        assert_eq!(value["failures"][0]["status"]["kind"], "launch_failed");
        Ok(())
    }
}
