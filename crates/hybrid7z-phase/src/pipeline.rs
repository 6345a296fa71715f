//! One complete run: load filters, partition every target, then schedule phases.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hybrid7z_config::Hybrid7zConfig;
use tracing::{info, warn};

use crate::archiver::{Archiver, ArchiverInvoker};
use crate::catalog::FilterCatalog;
use crate::error::PhaseError;
use crate::invocation::InvocationContext;
use crate::partition::{FilterPartitioner, PartitionTable};
use crate::phase::PhaseList;
use crate::scheduler::PhaseScheduler;
use crate::summary::RunSummary;
use crate::target::Target;

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct RunReport {
    /// Aggregated invocation results.
    pub summary: RunSummary,
    /// Filter lists and eligibility computed for the run.
    pub partition: PartitionTable,
}

/// Wires configuration, filter catalog, partitioner and scheduler together.
pub struct Hybrid7zPipeline {
    config: Hybrid7zConfig,
    phases: PhaseList,
    filter_folder: PathBuf,
    log_folder: PathBuf,
    archiver: Arc<dyn Archiver>,
}

impl std::fmt::Debug for Hybrid7zPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hybrid7zPipeline")
            .field("phases", &self.phases)
            .field("filter_folder", &self.filter_folder)
            .field("log_folder", &self.log_folder)
            .finish_non_exhaustive()
    }
}

impl Hybrid7zPipeline {
    /// Pipeline running the real archiver process.
    ///
    /// Relative folders resolve against the current directory here; the archiver runs
    /// inside each target and must receive absolute list paths.
    #[must_use]
    pub fn new(
        config: Hybrid7zConfig,
        filter_folder: impl Into<PathBuf>,
        log_folder: impl Into<PathBuf>,
    ) -> Self {
        let phases = PhaseList::from_config(&config);
        Self {
            config,
            phases,
            filter_folder: absolute_folder(filter_folder.into()),
            log_folder: absolute_folder(log_folder.into()),
            archiver: Arc::new(ArchiverInvoker),
        }
    }

    /// Replace the archiver implementation.
    #[must_use]
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Resolved phases.
    #[must_use]
    pub const fn phases(&self) -> &PhaseList {
        &self.phases
    }

    /// Absolute folder holding filter files and generated filter lists.
    #[must_use]
    pub fn filter_folder(&self) -> &Path {
        &self.filter_folder
    }

    /// Partition every target, then run every phase.
    pub async fn run(&self, targets: &[Target]) -> RunReport {
        info!(
            phases = ?self.config.phase_names().collect::<Vec<_>>(),
            targets = targets.len(),
            filter_folder = %self.filter_folder.display(),
            "starting run"
        );

        let catalog = FilterCatalog::new(&self.filter_folder);
        let filters = catalog.load_all(&self.phases).await;

        let partitioner = FilterPartitioner::new(self.phases.clone(), filters, &self.filter_folder);
        let partition = partitioner.partition(targets).await;
        info!(
            filter_lists = partition.generated_files().count(),
            "partitioning finished"
        );

        let context =
            InvocationContext::from_config(&self.config, &self.filter_folder, self.log_folder.clone());
        let scheduler = PhaseScheduler::new(&self.phases, Arc::clone(&self.archiver));
        let summary = scheduler.run(targets, &partition, &context).await;

        RunReport { summary, partition }
    }
}

fn absolute_folder(folder: PathBuf) -> PathBuf {
    if folder.is_absolute() {
        return folder;
    }
    match std::path::absolute(&folder) {
        Ok(absolute) => absolute,
        Err(source) => {
            let err = PhaseError::io("pipeline.absolute_folder", &folder, source);
            warn!(error = %err, detail = ?err, "failed to resolve folder; using it as given");
            folder
        }
    }
}
