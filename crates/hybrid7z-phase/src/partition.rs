//! Filter partitioning: phase patterns against live directory trees.
//!
//! # Design
//! - Every (target, non-terminal phase) pair runs as its own task; patterns of one pair
//!   are matched concurrently on the blocking pool.
//! - `AvailableFileSet` is the only shared mutable state. Its lock covers the
//!   read-then-remove of one pattern's matches and nothing else.
//! - Removal only gates terminal eligibility; overlapping patterns of different phases
//!   both claim the same files.
//! - Claim lists keep pattern declaration order, so re-runs write identical files.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use globset::{GlobBuilder, GlobMatcher};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::PhaseFilters;
use crate::error::{PhaseError, PhaseResult};
use crate::phase::{Phase, PhaseList};
use crate::target::Target;

/// Extension of generated filter lists.
pub const FILTER_LIST_SUFFIX: &str = "lst";

/// Case-folded files of one target not yet claimed by any phase.
#[derive(Debug, Default)]
pub struct AvailableFileSet {
    files: Mutex<HashSet<String>>,
}

impl AvailableFileSet {
    /// Enumerate every file below `root` once.
    ///
    /// # Errors
    ///
    /// Returns an error when the traversal fails.
    pub fn from_listing(root: &Path) -> PhaseResult<Self> {
        let files = list_files(root, root, None)?.into_iter().collect();
        Ok(Self {
            files: Mutex::new(files),
        })
    }

    /// Remove `matched` paths; the first remover of a path wins.
    ///
    /// Returns how many paths this call removed.
    pub fn claim(&self, matched: &[String]) -> usize {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        matched.iter().filter(|path| files.remove(*path)).count()
    }

    /// Number of unclaimed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether every file has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generated filter list of one (target, phase) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterListEntry {
    /// Phase the list belongs to.
    pub phase: String,
    /// Location of the written list.
    pub path: PathBuf,
}

/// Outcome of partitioning every target.
///
/// Entries are written once while partitioning and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    filter_lists: BTreeMap<(usize, usize), FilterListEntry>,
    terminal_eligible: BTreeSet<usize>,
    unclaimed: BTreeMap<usize, usize>,
}

impl PartitionTable {
    /// Filter list generated for (`target`, `phase`), if the phase claimed anything.
    #[must_use]
    pub fn filter_list(&self, target: usize, phase: &Phase) -> Option<&Path> {
        self.filter_lists
            .get(&(target, phase.ordinal))
            .map(|entry| entry.path.as_path())
    }

    /// Every filter list generated for `target`, in phase order.
    pub fn filter_lists_for(&self, target: usize) -> impl Iterator<Item = &FilterListEntry> {
        self.filter_lists
            .range((target, 0)..=(target, usize::MAX))
            .map(|(_, entry)| entry)
    }

    /// Whether the terminal phase should run for `target`.
    #[must_use]
    pub fn is_terminal_eligible(&self, target: usize) -> bool {
        self.terminal_eligible.contains(&target)
    }

    /// Files of `target` left for the terminal phase.
    #[must_use]
    pub fn unclaimed_count(&self, target: usize) -> usize {
        self.unclaimed.get(&target).copied().unwrap_or_default()
    }

    /// Every generated filter list.
    pub fn generated_files(&self) -> impl Iterator<Item = &Path> {
        self.filter_lists.values().map(|entry| entry.path.as_path())
    }

    /// Delete every generated filter list; failures are logged.
    ///
    /// Returns the number of deleted files.
    pub fn delete_generated(&self) -> usize {
        self.generated_files()
            .filter(|path| match fs::remove_file(path) {
                Ok(()) => {
                    info!(path = %path.display(), "deleted filter list");
                    true
                }
                Err(source) => {
                    let err = PhaseError::io("partition.delete_list", *path, source);
                    warn!(error = %err, detail = ?err, "failed to delete filter list");
                    false
                }
            })
            .count()
    }
}

/// Turns phase patterns and directory state into filter lists and terminal eligibility.
#[derive(Debug, Clone)]
pub struct FilterPartitioner {
    phases: PhaseList,
    filters: PhaseFilters,
    cache_folder: PathBuf,
}

struct PairOutcome {
    target: usize,
    phase: usize,
    entry: Option<FilterListEntry>,
}

impl FilterPartitioner {
    /// Partitioner writing filter lists into `cache_folder`.
    #[must_use]
    pub fn new(phases: PhaseList, filters: PhaseFilters, cache_folder: impl Into<PathBuf>) -> Self {
        Self {
            phases,
            filters,
            cache_folder: cache_folder.into(),
        }
    }

    /// Location of the filter list for one (target, phase) pair.
    #[must_use]
    pub fn filter_list_path(&self, target: &Target, index: usize, phase: &str) -> PathBuf {
        self.cache_folder.join(format!(
            "{}.{index}.{phase}.{FILTER_LIST_SUFFIX}",
            target.name()
        ))
    }

    /// Partition every target. Completes only after every pair has finished.
    pub async fn partition(&self, targets: &[Target]) -> PartitionTable {
        if let Err(source) = tokio::fs::create_dir_all(&self.cache_folder).await {
            let err = PhaseError::io("partition.create_cache", &self.cache_folder, source);
            warn!(error = %err, detail = ?err, "failed to create filter cache folder");
        }

        let available = list_targets(targets).await;

        let mut pairs = JoinSet::new();
        for (index, target) in targets.iter().enumerate() {
            for phase in self.phases.non_terminal() {
                let patterns = self.filters.patterns(&phase.name);
                let set = Arc::clone(&available[index]);
                let target = target.clone();
                let phase_name = phase.name.clone();
                let ordinal = phase.ordinal;
                let list_path = self.filter_list_path(&target, index, &phase.name);
                pairs.spawn(async move {
                    let claims = claim_patterns(&target, &phase_name, &patterns, &set).await;
                    let entry = write_filter_list(&target, &phase_name, &claims, list_path).await;
                    PairOutcome {
                        target: index,
                        phase: ordinal,
                        entry,
                    }
                });
            }
        }

        let mut table = PartitionTable::default();
        while let Some(joined) = pairs.join_next().await {
            match joined {
                Ok(PairOutcome {
                    target,
                    phase,
                    entry: Some(entry),
                }) => {
                    table.filter_lists.insert((target, phase), entry);
                }
                Ok(_) => {}
                Err(err) => {
                    let err = PhaseError::join("partition.pair", err);
                    warn!(error = %err, detail = ?err, "partition task failed");
                }
            }
        }

        for (index, (target, set)) in targets.iter().zip(&available).enumerate() {
            let remaining = set.len();
            table.unclaimed.insert(index, remaining);
            if remaining > 0 {
                table.terminal_eligible.insert(index);
            }
            debug!(
                target = %target.source().display(),
                unclaimed = remaining,
                terminal_eligible = remaining > 0,
                "partitioned target"
            );
        }
        table
    }
}

async fn list_targets(targets: &[Target]) -> Vec<Arc<AvailableFileSet>> {
    let mut listings = JoinSet::new();
    for (index, target) in targets.iter().enumerate() {
        let root = target.source().to_path_buf();
        listings.spawn_blocking(move || (index, AvailableFileSet::from_listing(&root), root));
    }

    let mut sets: Vec<Arc<AvailableFileSet>> = (0..targets.len())
        .map(|_| Arc::new(AvailableFileSet::default()))
        .collect();
    while let Some(joined) = listings.join_next().await {
        match joined {
            Ok((index, Ok(set), root)) => {
                info!(target = %root.display(), files = set.len(), "listed target files");
                sets[index] = Arc::new(set);
            }
            Ok((_, Err(err), root)) => {
                warn!(target = %root.display(), error = %err, detail = ?err, "failed to list target files");
            }
            Err(err) => {
                let err = PhaseError::join("partition.list", err);
                warn!(error = %err, detail = ?err, "listing task failed");
            }
        }
    }
    sets
}

async fn claim_patterns(
    target: &Target,
    phase: &str,
    patterns: &Arc<[String]>,
    set: &Arc<AvailableFileSet>,
) -> Vec<String> {
    let mut matchers = JoinSet::new();
    for index in 0..patterns.len() {
        let patterns = Arc::clone(patterns);
        let set = Arc::clone(set);
        let root = target.source().to_path_buf();
        matchers.spawn_blocking(move || {
            let pattern = &patterns[index];
            match match_pattern(&root, pattern) {
                Ok(matched) if matched.is_empty() => None,
                Ok(matched) => {
                    let removed = set.claim(&matched);
                    debug!(
                        pattern = %pattern,
                        matched = matched.len(),
                        removed,
                        "pattern claimed files"
                    );
                    Some(index)
                }
                Err(err) => {
                    warn!(
                        target = %root.display(),
                        pattern = %pattern,
                        error = %err,
                        detail = ?err,
                        "pattern matching failed; treating as no match"
                    );
                    None
                }
            }
        });
    }

    let mut claimed = Vec::new();
    while let Some(joined) = matchers.join_next().await {
        match joined {
            Ok(Some(index)) => claimed.push(index),
            Ok(None) => {}
            Err(err) => {
                let err = PhaseError::join("partition.match", err);
                warn!(phase, error = %err, detail = ?err, "pattern task failed");
            }
        }
    }
    claimed.sort_unstable();

    let name = target.name();
    claimed
        .into_iter()
        .map(|index| {
            let pattern = &patterns[index];
            if target.include_root() {
                format!("{name}{MAIN_SEPARATOR}{pattern}")
            } else {
                pattern.clone()
            }
        })
        .collect()
}

async fn write_filter_list(
    target: &Target,
    phase: &str,
    claims: &[String],
    path: PathBuf,
) -> Option<FilterListEntry> {
    if claims.is_empty() {
        debug!(phase, target = %target.source().display(), "phase claimed nothing");
        return None;
    }

    let mut contents = claims.join("\n");
    contents.push('\n');
    match tokio::fs::write(&path, contents).await {
        Ok(()) => {
            info!(
                phase,
                target = %target.source().display(),
                patterns = claims.len(),
                list = %path.display(),
                "wrote filter list"
            );
            Some(FilterListEntry {
                phase: phase.to_string(),
                path,
            })
        }
        Err(source) => {
            let err = PhaseError::io("partition.write_list", &path, source);
            warn!(phase, error = %err, detail = ?err, "failed to write filter list");
            None
        }
    }
}

/// Case-folded absolute paths of files below `root` matching `pattern`.
///
/// A pattern naming a subdirectory that does not exist matches nothing.
///
/// # Errors
///
/// Returns an error when the glob does not compile or the traversal fails.
pub fn match_pattern(root: &Path, pattern: &str) -> PhaseResult<Vec<String>> {
    let (subdir, name_glob) = split_pattern(pattern);
    let search_root = if subdir.is_empty() {
        root.to_path_buf()
    } else {
        let candidate = root.join(subdir);
        if !candidate.is_dir() {
            debug!(pattern, subdir, "pattern subdirectory missing; skipping");
            return Ok(Vec::new());
        }
        candidate
    };

    let matcher = compile_name_glob(name_glob)?;
    list_files(root, &search_root, Some(&matcher))
}

fn split_pattern(pattern: &str) -> (&str, &str) {
    let (subdir, name) = pattern
        .rfind(['/', '\\'])
        .map_or(("", pattern), |at| (&pattern[..at], &pattern[at + 1..]));
    let subdir = subdir.trim_matches(['/', '\\']);
    let name = if name.is_empty() { "*" } else { name };
    (subdir, name)
}

fn compile_name_glob(glob: &str) -> PhaseResult<GlobMatcher> {
    GlobBuilder::new(glob)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| PhaseError::glob("partition.compile", glob.to_string(), source))
}

fn list_files(
    root: &Path,
    search_root: &Path,
    matcher: Option<&GlobMatcher>,
) -> PhaseResult<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(search_root) {
        let entry = entry.map_err(|source| PhaseError::walkdir("partition.walk", root, source))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_none_or(|matcher| matcher.is_match(entry.file_name())) {
            files.push(normalize(entry.path()));
        }
    }
    Ok(files)
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
