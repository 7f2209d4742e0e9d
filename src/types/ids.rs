//! Newtype wrappers for domain identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The name of a configured project.
///
/// Projects are the unit of isolation: every queue, integrator, and state
/// file is keyed by project name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(pub String);

impl ProjectName {
    pub fn new(s: impl Into<String>) -> Self {
        ProjectName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        ProjectName(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        ProjectName(s.to_string())
    }
}
