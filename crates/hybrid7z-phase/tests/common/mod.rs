#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hybrid7z_phase::{
    Archiver, ExitCodeMeaning, Invocation, InvocationOutcome, InvocationStatus, Lane, Phase,
    PhaseList,
};

/// Start or end of one recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started { phase: String, target: usize },
    Finished { phase: String, target: usize },
}

/// In-memory archiver recording every invocation it receives.
#[derive(Debug, Default)]
pub struct RecordingArchiver {
    events: Mutex<Vec<Event>>,
    invocations: Mutex<Vec<Invocation>>,
    failing_phases: HashSet<String>,
    delay: Duration,
}

impl RecordingArchiver {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(mut self, phase: &str) -> Self {
        self.failing_phases.insert(phase.to_string());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|invocations| invocations.clone())
            .unwrap_or_default()
    }

    pub fn invocations_of(&self, phase: &str) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|invocation| invocation.phase == phase)
            .collect()
    }

    fn push(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[async_trait]
impl Archiver for RecordingArchiver {
    async fn execute(&self, invocation: &Invocation) -> InvocationOutcome {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(invocation.clone());
        }
        self.push(Event::Started {
            phase: invocation.phase.clone(),
            target: invocation.target_index,
        });
        tokio::time::sleep(self.delay).await;
        self.push(Event::Finished {
            phase: invocation.phase.clone(),
            target: invocation.target_index,
        });

        let status = if self.failing_phases.contains(&invocation.phase) {
            InvocationStatus::Exited {
                code: Some(2),
                meaning: Some(ExitCodeMeaning::FatalError),
            }
        } else {
            InvocationStatus::Succeeded
        };
        InvocationOutcome::new(invocation, status)
    }
}

/// Phase list from `(name, lane)` pairs; the last one is terminal.
pub fn phases(spec: &[(&str, Lane)]) -> PhaseList {
    PhaseList::from_phases(
        spec.iter()
            .map(|(name, lane)| Phase {
                name: (*name).to_string(),
                ordinal: 0,
                terminal: false,
                lane: *lane,
                parameters: Vec::new(),
                executable: PathBuf::from("7z"),
            })
            .collect(),
    )
}
