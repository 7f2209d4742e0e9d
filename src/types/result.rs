//! The record of one integration attempt, and its carried-forward summary.
//!
//! Each new `IntegrationResult` is chained off its predecessor by holding an
//! immutable [`IntegrationSummary`] snapshot, never a live reference. Only
//! the tail of the chain is retained in memory; the state manager persists
//! the full latest result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::condition::{BuildCondition, BuildParameters, IntegrationRequest};
use super::ids::ProjectName;
use super::modification::Modification;
use super::status::IntegrationStatus;

/// Output of one task in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task name, as configured.
    pub name: String,
    /// Whether the task reported success.
    pub succeeded: bool,
    /// Captured output (stdout + stderr), possibly truncated.
    pub output: String,
    /// Process exit code where applicable.
    pub exit_code: Option<i32>,
    /// Wall-clock duration of the task.
    pub duration_ms: u64,
}

impl TaskResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        TaskResult {
            name: name.into(),
            succeeded: true,
            output: output.into(),
            exit_code: Some(0),
            duration_ms: 0,
        }
    }

    pub fn failure(name: impl Into<String>, output: impl Into<String>) -> Self {
        TaskResult {
            name: name.into(),
            succeeded: false,
            output: output.into(),
            exit_code: None,
            duration_ms: 0,
        }
    }
}

/// Immutable projection of a completed integration.
///
/// Cheap to clone and carry forward as the "last known" pointer; also the
/// baseline labellers generate from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationSummary {
    pub status: IntegrationStatus,
    pub label: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Change number of the newest modification in that integration.
    pub last_change_number: Option<String>,
}

impl IntegrationSummary {
    /// The baseline for a project with no recorded history.
    pub fn initial() -> Self {
        IntegrationSummary {
            status: IntegrationStatus::Unknown,
            label: None,
            start_time: None,
            end_time: None,
            last_change_number: None,
        }
    }

    /// True when this summary represents "no integration has happened".
    pub fn is_initial(&self) -> bool {
        self.status == IntegrationStatus::Unknown && self.label.is_none()
    }
}

impl Default for IntegrationSummary {
    fn default() -> Self {
        IntegrationSummary::initial()
    }
}

/// The record of one integration attempt.
///
/// Created by the integrator at the start of a cycle, owned exclusively by
/// that cycle until handed to the state manager and (read-only) to
/// publishers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationResult {
    pub project: ProjectName,
    pub working_directory: PathBuf,
    pub artifact_directory: PathBuf,
    /// The request that caused this integration.
    pub request: IntegrationRequest,
    pub label: String,
    pub status: IntegrationStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub modifications: Vec<Modification>,
    pub task_results: Vec<TaskResult>,
    /// Error raised while fetching modifications, if any.
    pub source_control_error: Option<String>,
    /// Error raised by the pipeline itself (as opposed to a failing task).
    pub exception: Option<String>,
    /// Snapshot of the predecessor integration.
    pub last_integration: IntegrationSummary,
}

impl IntegrationResult {
    /// Creates a fresh result chained off the previous summary.
    pub fn new(
        project: ProjectName,
        working_directory: impl Into<PathBuf>,
        artifact_directory: impl Into<PathBuf>,
        request: IntegrationRequest,
        last_integration: IntegrationSummary,
    ) -> Self {
        IntegrationResult {
            project,
            working_directory: working_directory.into(),
            artifact_directory: artifact_directory.into(),
            request,
            label: String::new(),
            status: IntegrationStatus::Unknown,
            start_time: None,
            end_time: None,
            modifications: Vec::new(),
            task_results: Vec::new(),
            source_control_error: None,
            exception: None,
            last_integration,
        }
    }

    pub fn build_condition(&self) -> BuildCondition {
        self.request.condition
    }

    pub fn parameters(&self) -> &BuildParameters {
        &self.request.parameters
    }

    /// Marks the start of the integration.
    pub fn mark_start(&mut self, now: DateTime<Utc>) {
        self.start_time = Some(now);
    }

    /// Re-stamps the start time, used when the quiet period re-polls.
    pub fn set_start_time(&mut self, now: DateTime<Utc>) {
        self.start_time = Some(now);
    }

    /// Marks the end of the integration. The end time never precedes the
    /// start time, even if the clock moved backwards in between.
    pub fn mark_end(&mut self, now: DateTime<Utc>) {
        let end = match self.start_time {
            Some(start) if now < start => start,
            _ => now,
        };
        self.end_time = Some(end);
    }

    pub fn has_modifications(&self) -> bool {
        !self.modifications.is_empty()
    }

    pub fn has_source_control_error(&self) -> bool {
        self.source_control_error.is_some()
    }

    /// Whether the build phase should run at all for this cycle.
    pub fn should_run_build(&self) -> bool {
        self.request.condition == BuildCondition::ForceBuild || self.has_modifications()
    }

    pub fn succeeded(&self) -> bool {
        self.status == IntegrationStatus::Success
    }

    pub fn failed(&self) -> bool {
        self.status == IntegrationStatus::Failure
    }

    /// True when this integration repaired a previously broken build.
    pub fn fixed(&self) -> bool {
        self.succeeded()
            && matches!(
                self.last_integration.status,
                IntegrationStatus::Failure | IntegrationStatus::Exception
            )
    }

    /// Change number of the newest modification in this integration, falling
    /// back to the predecessor's.
    pub fn last_change_number(&self) -> Option<String> {
        Modification::last_change_number(&self.modifications)
            .or_else(|| self.last_integration.last_change_number.clone())
    }

    pub fn total_duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Computes the final status from what the pipeline recorded.
    ///
    /// An exception outranks a task failure; a clean run is a success.
    pub fn finalize_status(&mut self) {
        self.status = if self.exception.is_some() || self.has_source_control_error() {
            IntegrationStatus::Exception
        } else if self.task_results.iter().any(|t| !t.succeeded) {
            IntegrationStatus::Failure
        } else {
            IntegrationStatus::Success
        };
    }

    /// Projects this result into its carried-forward summary.
    pub fn summary(&self) -> IntegrationSummary {
        IntegrationSummary {
            status: self.status,
            label: if self.label.is_empty() {
                None
            } else {
                Some(self.label.clone())
            },
            start_time: self.start_time,
            end_time: self.end_time,
            last_change_number: self.last_change_number(),
        }
    }
}
