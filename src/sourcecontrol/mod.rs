//! Source-control collaborators.
//!
//! The integrator only ever talks to source control through the narrow
//! [`SourceControl`] interface; concrete adapters are swappable plugins.
//! Two reference adapters ship in-repo: [`FileSystemSourceControl`] (watch
//! a directory tree for changed files) and [`NullSourceControl`] (for
//! projects that are only ever force-built, and for tests).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{IntegrationResult, IntegrationSummary, Modification};

pub mod filesystem;
pub mod null;
pub mod quiet_period;

pub use filesystem::FileSystemSourceControl;
pub use null::NullSourceControl;
pub use quiet_period::{QuietPeriod, QuietPeriodError};

/// Errors raised by a source-control adapter.
///
/// These are expected to be transient (network hiccup, tool failure); the
/// integrator records them on the result rather than crashing.
#[derive(Debug, Error)]
pub enum SourceControlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The provider refused or failed the operation.
    #[error("source control failed: {0}")]
    Failed(String),
}

/// Result type for source-control operations.
pub type Result<T> = std::result::Result<T, SourceControlError>;

/// A source-control provider, as seen by the core.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Returns the modifications committed between the previous integration
    /// and the start of this one.
    async fn get_modifications(
        &self,
        from: &IntegrationSummary,
        to: &IntegrationResult,
    ) -> Result<Vec<Modification>>;

    /// Brings the working directory up to date for the given integration.
    async fn get_source(&self, result: &IntegrationResult) -> Result<()>;

    /// Tags/labels the built revision after a successful integration.
    async fn label_source_control(&self, result: &IntegrationResult) -> Result<()>;
}
