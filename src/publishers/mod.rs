//! Result publishers.
//!
//! Publishers receive the finished integration result read-only. A
//! publisher failure is logged and never fails the integration.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::IntegrationResult;

pub mod artifact;
pub mod log;

pub use artifact::ArtifactPublisher;
pub use log::LogPublisher;

/// Errors raised while publishing a result.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Failed(String),
}

/// Result type for publisher operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Reports a finished integration externally.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    /// Publishes the finished result.
    async fn publish(&self, result: &IntegrationResult) -> Result<()>;
}
