//! Build conditions and the request types built on top of them.
//!
//! `BuildCondition` carries an explicit priority ordering. That ordering is
//! the invariant the request queue and trigger composition are built on: a
//! stronger condition always pre-empts a weaker pending one, and a weaker
//! arriving condition never downgrades a stronger one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::ProjectName;

/// Why (and how urgently) a build should run.
///
/// Variants are declared in ascending priority so the derived `Ord`
/// implements the collapsing rule directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildCondition {
    /// No build is wanted.
    #[default]
    NoBuild,
    /// Build only if source control reports modifications.
    IfModificationExists,
    /// Build unconditionally.
    ForceBuild,
}

impl fmt::Display for BuildCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildCondition::NoBuild => "no build",
            BuildCondition::IfModificationExists => "if modification exists",
            BuildCondition::ForceBuild => "force build",
        };
        write!(f, "{}", s)
    }
}

/// A name/value pair passed into the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name: String,
    pub value: String,
}

impl NameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        NameValuePair {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parameters attached to a (usually forced) build request.
pub type BuildParameters = Vec<NameValuePair>;

/// Where a build request originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestSource {
    /// An interval trigger elapsed.
    IntervalTrigger,
    /// A schedule trigger reached its daily time.
    ScheduleTrigger,
    /// A dependency project produced a new build.
    ProjectTrigger { project: ProjectName },
    /// A user forced the build (via the management API or elsewhere).
    User { name: String },
    /// The management API without a named user.
    Api,
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestSource::IntervalTrigger => write!(f, "interval trigger"),
            RequestSource::ScheduleTrigger => write!(f, "schedule trigger"),
            RequestSource::ProjectTrigger { project } => {
                write!(f, "project trigger ({})", project)
            }
            RequestSource::User { name } => write!(f, "user {}", name),
            RequestSource::Api => write!(f, "api"),
        }
    }
}

/// A pending build request, as held by the request queue.
///
/// Ephemeral: created when a trigger fires or a force arrives, consumed by
/// the integrator on its next poll of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub condition: BuildCondition,
    /// Who asked, when a user forced the build.
    pub requested_by: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    /// Parameters to pass to the pipeline (forced builds only).
    pub parameters: BuildParameters,
}

impl BuildRequest {
    /// Creates a request for the given condition.
    pub fn new(condition: BuildCondition) -> Self {
        BuildRequest {
            condition,
            requested_by: None,
            enqueued_at: Utc::now(),
            parameters: Vec::new(),
        }
    }

    /// Creates a forced-build request on behalf of a user.
    pub fn forced(user: impl Into<String>, parameters: BuildParameters) -> Self {
        BuildRequest {
            condition: BuildCondition::ForceBuild,
            requested_by: Some(user.into()),
            enqueued_at: Utc::now(),
            parameters,
        }
    }

    /// Converts the queued request into the unit handed to the pipeline.
    pub fn into_integration_request(self) -> IntegrationRequest {
        let source = match self.requested_by {
            Some(name) => RequestSource::User { name },
            None => RequestSource::Api,
        };
        IntegrationRequest {
            condition: self.condition,
            source,
            parameters: self.parameters,
        }
    }
}

/// The unit passed into the integration pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRequest {
    pub condition: BuildCondition,
    pub source: RequestSource,
    pub parameters: BuildParameters,
}

impl IntegrationRequest {
    pub fn new(condition: BuildCondition, source: RequestSource) -> Self {
        IntegrationRequest {
            condition,
            source,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: BuildParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_are_ordered_by_priority() {
        assert!(BuildCondition::NoBuild < BuildCondition::IfModificationExists);
        assert!(BuildCondition::IfModificationExists < BuildCondition::ForceBuild);
    }

    #[test]
    fn strongest_condition_wins_max() {
        let strongest = [
            BuildCondition::IfModificationExists,
            BuildCondition::ForceBuild,
            BuildCondition::NoBuild,
        ]
        .into_iter()
        .max()
        .unwrap();
        assert_eq!(strongest, BuildCondition::ForceBuild);
    }

    #[test]
    fn forced_request_carries_user_and_parameters() {
        let request = BuildRequest::forced("alice", vec![NameValuePair::new("target", "release")]);

        assert_eq!(request.condition, BuildCondition::ForceBuild);
        assert_eq!(request.requested_by.as_deref(), Some("alice"));

        let integration = request.into_integration_request();
        assert_eq!(
            integration.source,
            RequestSource::User {
                name: "alice".to_string()
            }
        );
        assert_eq!(integration.parameters.len(), 1);
    }

    #[test]
    fn anonymous_request_maps_to_api_source() {
        let request = BuildRequest::new(BuildCondition::IfModificationExists);
        let integration = request.into_integration_request();
        assert_eq!(integration.source, RequestSource::Api);
    }
}
