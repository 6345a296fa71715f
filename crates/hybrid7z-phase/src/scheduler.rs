//! Phase scheduling across targets.
//!
//! # Design
//! - Phases are split into two lanes once, keeping declared order inside each lane.
//! - Lane A phases run one invocation per target, all targets concurrently; each phase
//!   drains before the next starts.
//! - Lane B starts only after Lane A drained and keeps exactly one target in flight.
//! - Outcomes are folded as they arrive; a failure never cancels siblings.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::archiver::Archiver;
use crate::error::PhaseError;
use crate::invocation::{Invocation, InvocationContext};
use crate::partition::PartitionTable;
use crate::phase::{Lane, Phase, PhaseList};
use crate::summary::{CompressionRatio, ResultAggregator, RunSummary};
use crate::target::Target;

/// Runs every (phase, target) invocation after partitioning.
pub struct PhaseScheduler {
    parallel: Vec<Phase>,
    exclusive: Vec<Phase>,
    archiver: Arc<dyn Archiver>,
}

impl std::fmt::Debug for PhaseScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseScheduler")
            .field("parallel", &self.parallel)
            .field("exclusive", &self.exclusive)
            .finish_non_exhaustive()
    }
}

impl PhaseScheduler {
    /// Split `phases` into lanes.
    #[must_use]
    pub fn new(phases: &PhaseList, archiver: Arc<dyn Archiver>) -> Self {
        let (parallel, exclusive): (Vec<Phase>, Vec<Phase>) = phases
            .phases()
            .iter()
            .cloned()
            .partition(|phase| phase.lane == Lane::EmbarrassinglyParallel);
        Self {
            parallel,
            exclusive,
            archiver,
        }
    }

    /// Phases of the parallel lane, in declared order.
    #[must_use]
    pub fn parallel_lane(&self) -> &[Phase] {
        &self.parallel
    }

    /// Phases of the exclusive lane, in declared order.
    #[must_use]
    pub fn exclusive_lane(&self) -> &[Phase] {
        &self.exclusive
    }

    /// Run every dispatchable invocation and fold the outcomes.
    pub async fn run(
        &self,
        targets: &[Target],
        partition: &PartitionTable,
        context: &InvocationContext,
    ) -> RunSummary {
        let mut aggregator = ResultAggregator::new();

        for phase in &self.parallel {
            info!(phase = %phase.name, targets = targets.len(), "running parallel phase");
            self.run_parallel_phase(phase, targets, partition, context, &mut aggregator)
                .await;
        }

        for (index, target) in targets.iter().enumerate() {
            for phase in &self.exclusive {
                let Some(invocation) = plan(phase, target, index, partition, context) else {
                    continue;
                };
                info!(
                    phase = %phase.name,
                    target = %target.source().display(),
                    "running exclusive phase"
                );
                aggregator.record(self.archiver.execute(&invocation).await);
            }
            aggregator.record_ratio(measure_ratio(target).await);
        }

        let summary = aggregator.finish();
        debug!(
            invocations = summary.invocations,
            any_failed = summary.any_failed,
            "scheduler finished"
        );
        summary
    }

    async fn run_parallel_phase(
        &self,
        phase: &Phase,
        targets: &[Target],
        partition: &PartitionTable,
        context: &InvocationContext,
        aggregator: &mut ResultAggregator,
    ) {
        let mut tasks = JoinSet::new();
        let mut pending = BTreeSet::new();
        for (index, target) in targets.iter().enumerate() {
            let Some(invocation) = plan(phase, target, index, partition, context) else {
                continue;
            };
            pending.insert(index);
            let archiver = Arc::clone(&self.archiver);
            tasks.spawn(async move { (index, archiver.execute(&invocation).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    pending.remove(&index);
                    aggregator.record(outcome);
                }
                Err(err) => {
                    let err = PhaseError::join("scheduler.invocation", err);
                    error!(phase = %phase.name, error = %err, detail = ?err, "invocation task failed");
                }
            }
        }

        for index in pending {
            aggregator.record_lost(
                &phase.name,
                targets[index].source(),
                "invocation task did not complete".to_string(),
            );
        }
    }
}

/// Invocation for (`phase`, `target`), or `None` when the pair has nothing to do.
fn plan(
    phase: &Phase,
    target: &Target,
    index: usize,
    partition: &PartitionTable,
    context: &InvocationContext,
) -> Option<Invocation> {
    if phase.terminal {
        if !partition.is_terminal_eligible(index) {
            warn!(
                phase = %phase.name,
                target = %target.source().display(),
                "every file was claimed by an earlier phase; skipping terminal phase"
            );
            return None;
        }
        let exclusions = partition
            .filter_lists_for(index)
            .map(|entry| entry.path.as_path());
        return Some(Invocation::for_terminal(
            context, phase, target, index, exclusions,
        ));
    }

    partition
        .filter_list(index, phase)
        .map(|list| Invocation::for_claimed(context, phase, target, index, list))
}

async fn measure_ratio(target: &Target) -> CompressionRatio {
    let name = target.name();
    let source = target.source().to_path_buf();
    let archive = target.destination();
    let fallback = CompressionRatio {
        name: name.clone(),
        original_bytes: 0,
        compressed_bytes: 0,
    };
    match tokio::task::spawn_blocking(move || CompressionRatio::measure(name, &source, &archive))
        .await
    {
        Ok(ratio) => ratio,
        Err(err) => {
            let err = PhaseError::join("scheduler.measure", err);
            warn!(error = %err, detail = ?err, "failed to measure compression ratio");
            fallback
        }
    }
}
