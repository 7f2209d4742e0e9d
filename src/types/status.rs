//! Status enums exposed for monitoring.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of one integration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    /// No integration has completed yet.
    #[default]
    Unknown,
    Success,
    /// The build ran and reported failure (a task failed or was aborted).
    Failure,
    /// Infrastructure went wrong: a task or collaborator errored out.
    Exception,
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegrationStatus::Unknown => "unknown",
            IntegrationStatus::Success => "success",
            IntegrationStatus::Failure => "failure",
            IntegrationStatus::Exception => "exception",
        };
        write!(f, "{}", s)
    }
}

/// What the integrator is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectActivity {
    /// Waiting for a trigger or a request.
    #[default]
    Sleeping,
    /// Polling source control (including any quiet-period wait).
    CheckingModifications,
    /// Running the task pipeline.
    Building,
    /// Saving state and notifying publishers.
    Publishing,
    /// A request is queued but the integrator has not started it yet.
    Pending,
}

impl fmt::Display for ProjectActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectActivity::Sleeping => "sleeping",
            ProjectActivity::CheckingModifications => "checking modifications",
            ProjectActivity::Building => "building",
            ProjectActivity::Publishing => "publishing",
            ProjectActivity::Pending => "pending",
        };
        write!(f, "{}", s)
    }
}

/// Whether the per-project integration loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorState {
    #[default]
    Stopped,
    Running,
    /// A stop was requested; the current cycle is finishing.
    Stopping,
}

impl fmt::Display for IntegratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegratorState::Stopped => "stopped",
            IntegratorState::Running => "running",
            IntegratorState::Stopping => "stopping",
        };
        write!(f, "{}", s)
    }
}

/// Aggregate project state for dashboards, derived from the last build
/// outcome and the current activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Success,
    Broken,
    Building,
    BrokenAndBuilding,
}

impl ProjectState {
    /// Derives the aggregate state from the last completed status and the
    /// integrator's current activity.
    pub fn from_parts(last_status: IntegrationStatus, activity: ProjectActivity) -> Self {
        let building = matches!(
            activity,
            ProjectActivity::Building | ProjectActivity::CheckingModifications
        );
        let broken = matches!(
            last_status,
            IntegrationStatus::Failure | IntegrationStatus::Exception
        );
        match (broken, building) {
            (false, false) => ProjectState::Success,
            (true, false) => ProjectState::Broken,
            (false, true) => ProjectState::Building,
            (true, true) => ProjectState::BrokenAndBuilding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_state_derivation_matrix() {
        assert_eq!(
            ProjectState::from_parts(IntegrationStatus::Success, ProjectActivity::Sleeping),
            ProjectState::Success
        );
        assert_eq!(
            ProjectState::from_parts(IntegrationStatus::Failure, ProjectActivity::Sleeping),
            ProjectState::Broken
        );
        assert_eq!(
            ProjectState::from_parts(IntegrationStatus::Success, ProjectActivity::Building),
            ProjectState::Building
        );
        assert_eq!(
            ProjectState::from_parts(IntegrationStatus::Exception, ProjectActivity::Building),
            ProjectState::BrokenAndBuilding
        );
    }

    #[test]
    fn unknown_status_counts_as_not_broken() {
        assert_eq!(
            ProjectState::from_parts(IntegrationStatus::Unknown, ProjectActivity::Sleeping),
            ProjectState::Success
        );
    }
}
