//! Filter pattern files, one per non-terminal phase.
//!
//! # Design
//! - `<filter folder>/<phase>.txt`, one pattern per line, `//` starts a comment.
//! - Missing or unreadable files degrade to an empty pattern list with a warning.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{PhaseError, PhaseResult};
use crate::phase::PhaseList;

/// Extension of filter pattern files.
pub const FILTER_FILE_SUFFIX: &str = "txt";

const LINE_COMMENT: &str = "//";

/// Reads phase filter files from one folder.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    folder: PathBuf,
}

impl FilterCatalog {
    /// Catalog rooted at `folder`.
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Location of the filter file for `phase`.
    #[must_use]
    pub fn filter_path(&self, phase: &str) -> PathBuf {
        self.folder.join(format!("{phase}.{FILTER_FILE_SUFFIX}"))
    }

    /// Ordered patterns of `phase`; empty when the file is missing or unreadable.
    #[must_use]
    pub fn load(&self, phase: &str) -> Vec<String> {
        let path = self.filter_path(phase);
        match read_filter_file(&path) {
            Ok(text) => {
                let patterns = parse_patterns(&text);
                debug!(phase, count = patterns.len(), path = %path.display(), "loaded filter patterns");
                patterns
            }
            Err(err) => {
                warn!(
                    phase,
                    path = %path.display(),
                    error = %err,
                    detail = ?err,
                    "filter file unavailable; phase proceeds without patterns"
                );
                Vec::new()
            }
        }
    }

    /// Load the patterns of every non-terminal phase concurrently.
    pub async fn load_all(&self, phases: &PhaseList) -> PhaseFilters {
        let mut tasks = JoinSet::new();
        for phase in phases.non_terminal() {
            let catalog = self.clone();
            let name = phase.name.clone();
            tasks.spawn_blocking(move || {
                let patterns = catalog.load(&name);
                (name, patterns)
            });
        }

        let mut filters = PhaseFilters::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, patterns)) => {
                    filters.by_phase.insert(name, patterns.into());
                }
                Err(err) => {
                    let err = PhaseError::join("catalog.load", err);
                    warn!(error = %err, detail = ?err, "filter load task failed");
                }
            }
        }
        filters
    }
}

/// Patterns of every non-terminal phase, shared read-only with matcher tasks.
#[derive(Debug, Clone, Default)]
pub struct PhaseFilters {
    by_phase: HashMap<String, Arc<[String]>>,
}

impl PhaseFilters {
    /// Patterns for `phase`; empty when the phase was not loaded.
    #[must_use]
    pub fn patterns(&self, phase: &str) -> Arc<[String]> {
        self.by_phase
            .get(phase)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Record patterns for `phase`, replacing earlier ones.
    pub fn insert(&mut self, phase: impl Into<String>, patterns: Vec<String>) {
        self.by_phase.insert(phase.into(), patterns.into());
    }
}

/// Parse filter file text into patterns, in file order.
#[must_use]
pub fn parse_patterns(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let content = line
                .split_once(LINE_COMMENT)
                .map_or(line, |(before, _)| before)
                .trim();
            let pattern = content.trim_start_matches(['/', '\\']);
            (!pattern.is_empty()).then(|| pattern.to_string())
        })
        .collect()
}

fn read_filter_file(path: &Path) -> PhaseResult<String> {
    fs::read_to_string(path).map_err(|source| PhaseError::io("catalog.read", path, source))
}
