//! Publishes build outcomes to the process log.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Publisher, Result};
use crate::types::IntegrationResult;

/// Writes a one-line build summary via `tracing`.
#[derive(Debug, Default, Clone)]
pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        LogPublisher
    }
}

#[async_trait]
impl Publisher for LogPublisher {
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&self, result: &IntegrationResult) -> Result<()> {
        let duration = result
            .total_duration()
            .map(|d| format!("{}s", d.num_seconds()))
            .unwrap_or_else(|| "?".to_string());

        if result.succeeded() {
            info!(
                project = %result.project,
                label = %result.label,
                %duration,
                fixed = result.fixed(),
                "integration succeeded"
            );
        } else {
            warn!(
                project = %result.project,
                label = %result.label,
                status = %result.status,
                %duration,
                modifications = result.modifications.len(),
                "integration did not succeed"
            );
        }
        Ok(())
    }
}
