//! Phase definitions resolved from configuration.

use std::path::PathBuf;

use hybrid7z_config::Hybrid7zConfig;
use serde::Serialize;

use crate::invocation::split_arguments;

/// Execution lane a phase is scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Lightweight phases; one invocation per target, all targets at once.
    EmbarrassinglyParallel,
    /// Heavy phases; one target in flight at a time.
    ExclusiveResource,
}

impl Lane {
    /// Lane for the configured `parallel` flag.
    #[must_use]
    pub const fn from_parallel(parallel: bool) -> Self {
        if parallel {
            Self::EmbarrassinglyParallel
        } else {
            Self::ExclusiveResource
        }
    }
}

/// One named step of the archiving sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    /// Phase name; also the stem of its filter file.
    pub name: String,
    /// Position in the declared phase list.
    pub ordinal: usize,
    /// Whether this is the last declared phase (the catch-all).
    pub terminal: bool,
    /// Scheduling lane.
    pub lane: Lane,
    /// Phase-specific archiver arguments.
    pub parameters: Vec<String>,
    /// Archiver executable for this phase.
    pub executable: PathBuf,
}

/// Ordered, immutable list of phases for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseList {
    phases: Vec<Phase>,
}

impl PhaseList {
    /// Resolve every configured phase; the last one is terminal.
    #[must_use]
    pub fn from_config(config: &Hybrid7zConfig) -> Self {
        let last = config.phases.len().saturating_sub(1);
        let phases = config
            .phases
            .iter()
            .enumerate()
            .map(|(ordinal, settings)| Phase {
                name: settings.name.clone(),
                ordinal,
                terminal: ordinal == last,
                lane: Lane::from_parallel(settings.parallel),
                parameters: split_arguments(&settings.parameters),
                executable: config.archiver_executable(&settings.name).to_path_buf(),
            })
            .collect();
        Self { phases }
    }

    /// Build a list from already resolved phases, fixing ordinals and the terminal flag.
    #[must_use]
    pub fn from_phases(phases: Vec<Phase>) -> Self {
        let last = phases.len().saturating_sub(1);
        let phases = phases
            .into_iter()
            .enumerate()
            .map(|(ordinal, phase)| Phase {
                ordinal,
                terminal: ordinal == last,
                ..phase
            })
            .collect();
        Self { phases }
    }

    /// All phases in declared order.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Every phase except the terminal one.
    pub fn non_terminal(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter().filter(|phase| !phase.terminal)
    }

    /// The terminal phase, when any phase is declared.
    #[must_use]
    pub fn terminal(&self) -> Option<&Phase> {
        self.phases.last()
    }

    /// Number of declared phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Whether no phase is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}
