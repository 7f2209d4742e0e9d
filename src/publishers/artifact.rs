//! Publishes a JSON build report into the artifact directory.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{PublishError, Publisher, Result};
use crate::persistence::fsync::write_atomic;
use crate::types::IntegrationResult;

/// Writes `build-<label>.json` (or `build-latest.json` when the result
/// carries no label) into the integration's artifact directory.
#[derive(Debug, Default, Clone)]
pub struct ArtifactPublisher;

#[derive(Serialize)]
struct BuildReport<'a> {
    #[serde(flatten)]
    result: &'a IntegrationResult,
    fixed: bool,
}

impl ArtifactPublisher {
    pub fn new() -> Self {
        ArtifactPublisher
    }
}

#[async_trait]
impl Publisher for ArtifactPublisher {
    fn name(&self) -> &str {
        "artifact"
    }

    async fn publish(&self, result: &IntegrationResult) -> Result<()> {
        let file_name = if result.label.is_empty() {
            "build-latest.json".to_string()
        } else {
            format!("build-{}.json", result.label)
        };
        let path = result.artifact_directory.join(file_name);

        let report = BuildReport {
            result,
            fixed: result.fixed(),
        };
        let bytes = serde_json::to_vec_pretty(&report)?;

        let path_for_write = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path_for_write, &bytes))
            .await
            .map_err(|e| PublishError::Failed(format!("report write panicked: {}", e)))??;

        debug!(project = %result.project, path = %path.display(), "wrote build report");
        Ok(())
    }
}
