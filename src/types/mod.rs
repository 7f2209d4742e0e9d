//! Core domain types for the integration life-cycle.

pub mod condition;
pub mod ids;
pub mod modification;
pub mod result;
pub mod status;

pub use condition::{
    BuildCondition, BuildParameters, BuildRequest, IntegrationRequest, NameValuePair,
    RequestSource,
};
pub use ids::ProjectName;
pub use modification::Modification;
pub use result::{IntegrationResult, IntegrationSummary, TaskResult};
pub use status::{IntegrationStatus, IntegratorState, ProjectActivity, ProjectState};
