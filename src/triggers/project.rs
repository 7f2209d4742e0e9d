//! Fires when a dependency project produces a new build.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::Trigger;
use crate::types::{IntegrationRequest, IntegrationStatus, ProjectName};

/// What the trigger needs to know about a dependency's last build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    pub project: ProjectName,
    pub status: IntegrationStatus,
    /// Identity of the last build: a new build has a new time.
    pub last_build_time: Option<DateTime<Utc>>,
    pub label: Option<String>,
}

/// Errors looking up a dependency project's status.
#[derive(Debug, Error)]
pub enum StatusSourceError {
    #[error("unknown project: {0}")]
    UnknownProject(ProjectName),

    #[error("status lookup failed: {0}")]
    Failed(String),
}

/// Where dependency-project status comes from.
///
/// The lookup is synchronous: in-process dependencies read shared state
/// directly, and an adapter for a remote server is expected to serve from
/// a cache it refreshes on its own schedule.
pub trait ProjectStatusSource: Send + Sync {
    fn project_status(
        &self,
        project: &ProjectName,
    ) -> Result<DependencyStatus, StatusSourceError>;
}

/// Decorates an inner trigger; its proposals only pass through when the
/// dependency project has produced a *new* build (identity, not status,
/// decides newness) whose status matches `trigger_status`.
pub struct ProjectTrigger {
    project: ProjectName,
    source: Arc<dyn ProjectStatusSource>,
    inner: Box<Trigger>,
    trigger_status: IntegrationStatus,
    /// Allow firing on the very first observation of the dependency.
    trigger_first_time: bool,
    last_seen: Option<DependencyStatus>,
}

impl std::fmt::Debug for ProjectTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectTrigger")
            .field("project", &self.project)
            .field("trigger_status", &self.trigger_status)
            .field("trigger_first_time", &self.trigger_first_time)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl ProjectTrigger {
    pub fn new(
        project: ProjectName,
        source: Arc<dyn ProjectStatusSource>,
        inner: impl Into<Trigger>,
    ) -> Self {
        ProjectTrigger {
            project,
            source,
            inner: Box::new(inner.into()),
            trigger_status: IntegrationStatus::Success,
            trigger_first_time: false,
            last_seen: None,
        }
    }

    pub fn with_trigger_status(mut self, status: IntegrationStatus) -> Self {
        self.trigger_status = status;
        self
    }

    pub fn triggering_first_time(mut self) -> Self {
        self.trigger_first_time = true;
        self
    }

    pub fn fire(&mut self) -> Option<IntegrationRequest> {
        // The inner trigger paces the dependency polls.
        let inner_request = self.inner.fire()?;
        // Consuming the inner proposal resets the inner trigger, whether
        // or not the dependency check lets it through.
        self.inner.integration_completed();

        let status = match self.source.project_status(&self.project) {
            Ok(status) => status,
            Err(e) => {
                warn!(project = %self.project, error = %e, "dependency status lookup failed");
                return None;
            }
        };

        let is_new_build = match &self.last_seen {
            None => self.trigger_first_time,
            Some(previous) => previous.last_build_time != status.last_build_time,
        };
        let matches = status.status == self.trigger_status;
        self.last_seen = Some(status);

        if is_new_build && matches {
            debug!(project = %self.project, "dependency produced a new build");
            Some(IntegrationRequest {
                condition: inner_request.condition,
                source: crate::types::RequestSource::ProjectTrigger {
                    project: self.project.clone(),
                },
                parameters: inner_request.parameters,
            })
        } else {
            None
        }
    }

    pub fn next_build(&self) -> Option<DateTime<Utc>> {
        self.inner.next_build()
    }

    pub fn integration_completed(&mut self) {
        self.inner.integration_completed();
    }
}
