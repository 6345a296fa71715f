//! Archiver process execution.
//!
//! # Design
//! - The scheduler only sees the [`Archiver`] trait; tests substitute recorders.
//! - STDOUT and STDERR are drained concurrently, line by line, into separate buffers.
//! - Each non-empty buffer becomes one log file named after the run, never an empty file.
//! - Launch failures and non-zero exits become failed outcomes; nothing propagates.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{error, info, trace, warn};

use crate::error::PhaseError;
use crate::invocation::Invocation;

/// Timestamp layout used in archiver log file names.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S-%6f";

/// Runs one archiver invocation to completion.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Execute `invocation`; failures are reported in the outcome.
    async fn execute(&self, invocation: &Invocation) -> InvocationOutcome;
}

/// Meaning of a non-zero archiver exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCodeMeaning {
    /// 1: non-fatal warning, e.g. locked files.
    Warning,
    /// 2: fatal error.
    FatalError,
    /// 7: command-line error.
    CommandLineError,
    /// 8: not enough memory for the operation.
    NotEnoughMemory,
    /// 255: the user stopped the process.
    UserStopped,
    /// Any other code.
    Unknown,
}

impl ExitCodeMeaning {
    /// Classify an exit code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Warning,
            2 => Self::FatalError,
            7 => Self::CommandLineError,
            8 => Self::NotEnoughMemory,
            255 => Self::UserStopped,
            _ => Self::Unknown,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Warning => "non-fatal warning",
            Self::FatalError => "fatal error",
            Self::CommandLineError => "command-line error",
            Self::NotEnoughMemory => "not enough memory for operation",
            Self::UserStopped => "user stopped the process",
            Self::Unknown => "unknown exit code",
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationStatus {
    /// Exit code zero.
    Succeeded,
    /// Non-zero exit code, or no code when terminated by a signal.
    Exited {
        /// Exit code, if the process reported one.
        code: Option<i32>,
        /// Classification of `code`.
        meaning: Option<ExitCodeMeaning>,
    },
    /// The process never started.
    LaunchFailed {
        /// Launch error rendered for reporting.
        reason: String,
    },
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationOutcome {
    /// Phase name.
    pub phase: String,
    /// Target source directory.
    pub target: PathBuf,
    /// Final status.
    pub status: InvocationStatus,
    /// STDOUT log written for the invocation.
    pub stdout_log: Option<PathBuf>,
    /// STDERR log written for the invocation.
    pub stderr_log: Option<PathBuf>,
}

impl InvocationOutcome {
    /// Outcome carrying `status` and no log files.
    #[must_use]
    pub fn new(invocation: &Invocation, status: InvocationStatus) -> Self {
        Self {
            phase: invocation.phase.clone(),
            target: invocation.target_source.clone(),
            status,
            stdout_log: None,
            stderr_log: None,
        }
    }

    /// Outcome for an exit code.
    #[must_use]
    pub fn from_exit_code(invocation: &Invocation, code: Option<i32>) -> Self {
        let status = match code {
            Some(0) => InvocationStatus::Succeeded,
            Some(code) => InvocationStatus::Exited {
                code: Some(code),
                meaning: Some(ExitCodeMeaning::from_code(code)),
            },
            None => InvocationStatus::Exited {
                code: None,
                meaning: None,
            },
        };
        Self::new(invocation, status)
    }

    /// Whether the invocation failed.
    #[must_use]
    pub const fn failed(&self) -> bool {
        !matches!(self.status, InvocationStatus::Succeeded)
    }
}

/// Runs the configured archiver executable as a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiverInvoker;

#[async_trait]
impl Archiver for ArchiverInvoker {
    async fn execute(&self, invocation: &Invocation) -> InvocationOutcome {
        let started_at = Local::now();
        let started = Instant::now();
        info!(
            phase = %invocation.phase,
            target = %invocation.target_source.display(),
            executable = %invocation.executable.display(),
            working_directory = %invocation.working_directory.display(),
            arguments = ?invocation.redacted_arguments(),
            "starting archiver"
        );

        let spawned = Command::new(&invocation.executable)
            .args(&invocation.arguments)
            .current_dir(&invocation.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                let reason = format!("{}: {source}", invocation.executable.display());
                let err = PhaseError::ArchiverLaunch {
                    executable: invocation.executable.clone(),
                    source,
                };
                error!(
                    phase = %invocation.phase,
                    target = %invocation.target_source.display(),
                    error = %err,
                    detail = ?err,
                    "failed to start archiver"
                );
                return InvocationOutcome::new(
                    invocation,
                    InvocationStatus::LaunchFailed { reason },
                );
            }
        };

        let pid = child.id().unwrap_or_default();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout_lines, stderr_lines, waited) = tokio::join!(
            drain_lines(stdout, "stdout", invocation),
            drain_lines(stderr, "stderr", invocation),
            child.wait(),
        );

        let code = match waited {
            Ok(status) => status.code(),
            Err(source) => {
                let err = PhaseError::io("archiver.wait", &invocation.executable, source);
                error!(phase = %invocation.phase, error = %err, detail = ?err, "failed to wait for archiver");
                None
            }
        };

        let mut outcome = InvocationOutcome::from_exit_code(invocation, code);
        outcome.stdout_log =
            write_log(invocation, &started_at, pid, LogStream::Stdout, &stdout_lines).await;
        outcome.stderr_log =
            write_log(invocation, &started_at, pid, LogStream::Stderr, &stderr_lines).await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome.status {
            InvocationStatus::Succeeded => info!(
                phase = %invocation.phase,
                target = %invocation.target_source.display(),
                pid,
                elapsed_ms,
                "archiver finished"
            ),
            InvocationStatus::Exited { code, meaning } => error!(
                phase = %invocation.phase,
                target = %invocation.target_source.display(),
                pid,
                exit_code = ?code,
                meaning = meaning.map_or("terminated without exit code", ExitCodeMeaning::describe),
                elapsed_ms,
                "archiver failed"
            ),
            InvocationStatus::LaunchFailed { .. } => {}
        }
        outcome
    }
}

/// Output stream of an archiver process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl LogStream {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Stdout => "STDOUT",
            Self::Stderr => "STDERR",
        }
    }
}

/// Log file name `<timestamp>-<pid>_<phase>(<target>)-<STREAM>.log`.
#[must_use]
pub fn log_file_name(
    started_at: &DateTime<Local>,
    pid: u32,
    phase: &str,
    target: &str,
    stream: LogStream,
) -> String {
    format!(
        "{}-{pid}_{phase}({target})-{}.log",
        started_at.format(LOG_TIMESTAMP_FORMAT),
        stream.suffix()
    )
}

async fn drain_lines<R>(reader: Option<R>, stream: &'static str, invocation: &Invocation) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Vec::new();
    };
    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let line = line.trim_end_matches(['\r', '\n']);
                if line.is_empty() {
                    continue;
                }
                trace!(phase = %invocation.phase, target = %invocation.target_name, stream, line);
                lines.push(line.to_string());
            }
            Err(err) => {
                warn!(phase = %invocation.phase, stream, error = %err, "failed to read archiver output");
                break;
            }
        }
    }
    lines
}

async fn write_log(
    invocation: &Invocation,
    started_at: &DateTime<Local>,
    pid: u32,
    stream: LogStream,
    lines: &[String],
) -> Option<PathBuf> {
    if lines.is_empty() {
        return None;
    }
    let path = invocation.log_folder.join(log_file_name(
        started_at,
        pid,
        &invocation.phase,
        &invocation.target_name,
        stream,
    ));
    match write_lines(&invocation.log_folder, &path, lines).await {
        Ok(()) => Some(path),
        Err(err) => {
            warn!(phase = %invocation.phase, error = %err, detail = ?err, "failed to write archiver log");
            None
        }
    }
}

async fn write_lines(folder: &Path, path: &Path, lines: &[String]) -> Result<(), PhaseError> {
    tokio::fs::create_dir_all(folder)
        .await
        .map_err(|source| PhaseError::io("archiver.create_log_folder", folder, source))?;
    let mut contents = lines.join("\n");
    contents.push('\n');
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| PhaseError::io("archiver.write_log", path, source))
}
