//! Archiver argument vectors for one (phase, target) pair.
//!
//! # Design
//! - Order: global parameters, phase parameters, the case switch, global exclusions,
//!   password, then the phase-kind specific tail.
//! - Filter lists are matched case-insensitively while partitioning, so every invocation
//!   ends its parameters with `-ssc-` and configured case switches are dropped.
//! - Non-terminal: `-ir@<list> -- <destination>`.
//! - Terminal: `-r -xr@<list>... -- <destination> <selector>`.

use std::path::{Path, PathBuf};

use hybrid7z_config::Hybrid7zConfig;
use tracing::debug;

use crate::phase::{Lane, Phase};
use crate::target::Target;

/// Exclusion list applied to every invocation when present in the filter folder.
pub const GLOBAL_EXCLUSION_FILE: &str = "Exclude.txt";

/// Archiver switch selecting case-insensitive wildcard matching.
pub const CASE_INSENSITIVE_SWITCH: &str = "-ssc-";

const CASE_SENSITIVE_SWITCH: &str = "-ssc";

const REDACTED: &str = "***";

/// Run-wide inputs shared by every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Arguments placed first on every invocation.
    pub global_parameters: Vec<String>,
    /// Exclusion lists applied to every invocation.
    pub exclusion_files: Vec<PathBuf>,
    /// Password argument template.
    pub password_format: String,
    /// Folder receiving the archiver logs.
    pub log_folder: PathBuf,
}

impl InvocationContext {
    /// Context for a run; the global exclusion list is used only when it exists.
    #[must_use]
    pub fn from_config(config: &Hybrid7zConfig, filter_folder: &Path, log_folder: PathBuf) -> Self {
        let exclusion = filter_folder.join(GLOBAL_EXCLUSION_FILE);
        let exclusion_files = if exclusion.is_file() {
            vec![exclusion]
        } else {
            debug!(path = %exclusion.display(), "no global exclusion list");
            Vec::new()
        };
        Self {
            global_parameters: split_arguments(&config.archiver.parameters),
            exclusion_files,
            password_format: config.archiver.password_parameter.clone(),
            log_folder,
        }
    }
}

/// One archiver process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Phase name.
    pub phase: String,
    /// Lane the phase runs on.
    pub lane: Lane,
    /// Whether the phase is terminal.
    pub terminal: bool,
    /// Position of the target in the run's target list.
    pub target_index: usize,
    /// Target name, used in log file names.
    pub target_name: String,
    /// Target source directory.
    pub target_source: PathBuf,
    /// Archive written by the invocation.
    pub destination: PathBuf,
    /// Archiver executable.
    pub executable: PathBuf,
    /// Process working directory.
    pub working_directory: PathBuf,
    /// Full argument vector.
    pub arguments: Vec<String>,
    /// Folder receiving STDOUT/STDERR logs.
    pub log_folder: PathBuf,
    secret_argument: Option<usize>,
}

impl Invocation {
    /// Invocation of a non-terminal phase restricted to its generated filter list.
    #[must_use]
    pub fn for_claimed(
        context: &InvocationContext,
        phase: &Phase,
        target: &Target,
        target_index: usize,
        filter_list: &Path,
    ) -> Self {
        let mut invocation = Self::base(context, phase, target, target_index);
        invocation
            .arguments
            .push(format!("-ir@{}", filter_list.display()));
        invocation.arguments.push("--".to_string());
        invocation
            .arguments
            .push(invocation.destination.display().to_string());
        invocation
    }

    /// Invocation of the terminal phase excluding every list generated for the target.
    #[must_use]
    pub fn for_terminal<'a>(
        context: &InvocationContext,
        phase: &Phase,
        target: &Target,
        target_index: usize,
        exclusions: impl IntoIterator<Item = &'a Path>,
    ) -> Self {
        let mut invocation = Self::base(context, phase, target, target_index);
        invocation.arguments.push("-r".to_string());
        invocation.arguments.extend(
            exclusions
                .into_iter()
                .map(|list| format!("-xr@{}", list.display())),
        );
        invocation.arguments.push("--".to_string());
        invocation
            .arguments
            .push(invocation.destination.display().to_string());
        invocation.arguments.push(if target.include_root() {
            target.name()
        } else {
            "*".to_string()
        });
        invocation
    }

    fn base(
        context: &InvocationContext,
        phase: &Phase,
        target: &Target,
        target_index: usize,
    ) -> Self {
        let mut arguments: Vec<String> = context
            .global_parameters
            .iter()
            .chain(&phase.parameters)
            .filter(|argument| !is_case_switch(argument))
            .cloned()
            .collect();
        arguments.push(CASE_INSENSITIVE_SWITCH.to_string());
        arguments.extend(
            context
                .exclusion_files
                .iter()
                .map(|file| format!("-xr@{}", file.display())),
        );
        let secret_argument = target
            .password_argument(&context.password_format)
            .map(|password| {
                arguments.push(password);
                arguments.len() - 1
            });

        Self {
            phase: phase.name.clone(),
            lane: phase.lane,
            terminal: phase.terminal,
            target_index,
            target_name: target.name(),
            target_source: target.source().to_path_buf(),
            destination: target.destination(),
            executable: phase.executable.clone(),
            working_directory: target.working_directory().to_path_buf(),
            arguments,
            log_folder: context.log_folder.clone(),
            secret_argument,
        }
    }

    /// Arguments with the password argument masked, for logging.
    #[must_use]
    pub fn redacted_arguments(&self) -> Vec<String> {
        self.arguments
            .iter()
            .enumerate()
            .map(|(index, argument)| {
                if Some(index) == self.secret_argument {
                    REDACTED.to_string()
                } else {
                    argument.clone()
                }
            })
            .collect()
    }
}

fn is_case_switch(argument: &str) -> bool {
    argument == CASE_SENSITIVE_SWITCH || argument == CASE_INSENSITIVE_SWITCH
}

/// Split a parameter string on whitespace; double quotes group and are removed.
#[must_use]
pub fn split_arguments(text: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if in_token {
                    arguments.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            ch => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        arguments.push(current);
    }
    arguments
}
