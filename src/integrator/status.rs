//! Shared, observable status for a running project.
//!
//! The integrator task writes here; the management API and dependency
//! triggers read. One cell per project, so contention is negligible and a
//! plain `RwLock` suffices.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::types::{
    IntegrationStatus, IntegrationSummary, IntegratorState, ProjectActivity, ProjectName,
    ProjectState,
};

/// Point-in-time view of a project, as served by the management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: ProjectName,
    pub activity: ProjectActivity,
    pub state: IntegratorState,
    pub project_state: ProjectState,
    pub last_status: IntegrationStatus,
    pub last_label: Option<String>,
    pub last_start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub last_end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// A request is queued but not yet started.
    pub pending: bool,
    pub queue_length: usize,
}

#[derive(Debug)]
struct Inner {
    activity: ProjectActivity,
    state: IntegratorState,
    last: IntegrationSummary,
}

/// Live status cell shared between the integrator task and its observers.
#[derive(Debug)]
pub struct StatusCell {
    project: ProjectName,
    inner: RwLock<Inner>,
}

impl StatusCell {
    pub fn new(project: ProjectName) -> Self {
        StatusCell {
            project,
            inner: RwLock::new(Inner {
                activity: ProjectActivity::Sleeping,
                state: IntegratorState::Stopped,
                last: IntegrationSummary::initial(),
            }),
        }
    }

    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    pub fn set_activity(&self, activity: ProjectActivity) {
        self.inner.write().unwrap().activity = activity;
    }

    pub fn set_state(&self, state: IntegratorState) {
        self.inner.write().unwrap().state = state;
    }

    /// Records the outcome of a completed integration.
    pub fn record_outcome(&self, summary: IntegrationSummary) {
        self.inner.write().unwrap().last = summary;
    }

    /// Seeds the last-integration summary, e.g. from loaded state.
    pub fn seed_last(&self, summary: IntegrationSummary) {
        self.inner.write().unwrap().last = summary;
    }

    pub fn activity(&self) -> ProjectActivity {
        self.inner.read().unwrap().activity
    }

    pub fn state(&self) -> IntegratorState {
        self.inner.read().unwrap().state
    }

    pub fn last_integration(&self) -> IntegrationSummary {
        self.inner.read().unwrap().last.clone()
    }

    /// Assembles the externally visible snapshot. Queue facts are passed in
    /// by the owner since the queue lives next to, not inside, the cell.
    pub fn snapshot(&self, pending: bool, queue_length: usize) -> ProjectSnapshot {
        let inner = self.inner.read().unwrap();
        // A queued-but-not-started request surfaces as Pending activity.
        let activity = if pending && inner.activity == ProjectActivity::Sleeping {
            ProjectActivity::Pending
        } else {
            inner.activity
        };
        ProjectSnapshot {
            project: self.project.clone(),
            activity,
            state: inner.state,
            project_state: ProjectState::from_parts(inner.last.status, activity),
            last_status: inner.last.status,
            last_label: inner.last.label.clone(),
            last_start_time: inner.last.start_time,
            last_end_time: inner.last.end_time,
            pending,
            queue_length,
        }
    }
}
