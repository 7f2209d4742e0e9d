//! A task that runs an external command.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Result, Task, TaskError};
use crate::types::{IntegrationResult, TaskResult};

/// Default per-task timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Captured output is truncated to this many bytes, keeping the tail.
const MAX_OUTPUT_BYTES: usize = 65536;

/// Runs an external command as a build task.
///
/// The child process is spawned with `kill_on_drop`, so dropping the
/// in-flight future (abort, timeout, shutdown) terminates the process
/// rather than leaking it.
#[derive(Debug, Clone)]
pub struct ExecTask {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    /// Overrides the integration's working directory when set.
    pub working_directory: Option<PathBuf>,
    pub timeout: Duration,
}

impl ExecTask {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        ExecTask {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            working_directory: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Task for ExecTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        result: &IntegrationResult,
        cancel: &CancellationToken,
    ) -> Result<TaskResult> {
        let working_directory = self
            .working_directory
            .clone()
            .unwrap_or_else(|| result.working_directory.clone());

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .current_dir(&working_directory)
            .env("CI", "true")
            .env("CI_PROJECT", result.project.as_str())
            .env("CI_LABEL", &result.label)
            .env("CI_BUILD_CONDITION", result.build_condition().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for pair in result.parameters() {
            command.env(&pair.name, &pair.value);
        }

        debug!(task = %self.name, command = %self.command, "running task");
        let started = Instant::now();

        let child = command.spawn().map_err(|source| TaskError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(task = %self.name, "task aborted");
                return Err(TaskError::Aborted);
            }
            outcome = tokio::time::timeout(self.timeout, child.wait_with_output()) => outcome,
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                let exit_code = output.status.code();
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&stderr);
                }
                Ok(TaskResult {
                    name: self.name.clone(),
                    succeeded: output.status.success(),
                    output: truncate_tail(text),
                    exit_code,
                    duration_ms,
                })
            }
            Ok(Err(e)) => Err(TaskError::Io(e)),
            Err(_elapsed) => Ok(TaskResult {
                name: self.name.clone(),
                succeeded: false,
                output: format!("timed out after {}s", self.timeout.as_secs()),
                exit_code: None,
                duration_ms,
            }),
        }
    }
}

/// Keeps the last `MAX_OUTPUT_BYTES` of the output, on a char boundary.
fn truncate_tail(text: String) -> String {
    if text.len() <= MAX_OUTPUT_BYTES {
        return text;
    }
    let mut start = text.len() - MAX_OUTPUT_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...truncated...\n{}", &text[start..])
}
