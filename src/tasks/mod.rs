//! The build task pipeline.
//!
//! Tasks are the work a build actually does. The integrator runs them in
//! order and stops at the first failure; a task error is captured on the
//! integration result, never propagated into the integrator loop.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::types::{IntegrationResult, TaskResult};

pub mod exec;

pub use exec::ExecTask;

/// Errors raised by a task that never produced a result.
///
/// A task that runs and fails returns `Ok` with a failed [`TaskResult`];
/// errors here mean the task infrastructure itself broke.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The build was aborted while the task was running.
    #[error("task aborted")]
    Aborted,

    /// The task's process could not be spawned.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;

/// One unit of build work.
#[async_trait]
pub trait Task: Send + Sync {
    /// The configured name of this task, used in reports.
    fn name(&self) -> &str;

    /// Runs the task against the in-progress integration.
    ///
    /// Implementations must honor `cancel` promptly - that is what makes
    /// `abort` cooperative rather than a process kill from outside.
    async fn run(&self, result: &IntegrationResult, cancel: &CancellationToken)
    -> Result<TaskResult>;
}
