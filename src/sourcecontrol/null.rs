//! A source-control adapter that reports nothing.
//!
//! Useful for projects that are only ever force-built, and for exercising
//! the integrator's error paths: each operation can be configured to fail.

use async_trait::async_trait;
use chrono::Utc;

use super::{Result, SourceControl, SourceControlError};
use crate::types::{IntegrationResult, IntegrationSummary, Modification};

/// Source control that never has modifications (unless told to pretend).
#[derive(Debug, Default, Clone)]
pub struct NullSourceControl {
    /// Report a single synthetic modification on every poll.
    pub always_modified: bool,
    pub fail_get_modifications: bool,
    pub fail_get_source: bool,
    pub fail_label_source_control: bool,
}

impl NullSourceControl {
    pub fn new() -> Self {
        NullSourceControl::default()
    }

    pub fn always_modified(mut self) -> Self {
        self.always_modified = true;
        self
    }

    pub fn failing_get_modifications(mut self) -> Self {
        self.fail_get_modifications = true;
        self
    }
}

#[async_trait]
impl SourceControl for NullSourceControl {
    async fn get_modifications(
        &self,
        _from: &IntegrationSummary,
        _to: &IntegrationResult,
    ) -> Result<Vec<Modification>> {
        if self.fail_get_modifications {
            return Err(SourceControlError::Failed(
                "configured to fail GetModifications".to_string(),
            ));
        }
        if self.always_modified {
            return Ok(vec![Modification::new("null", "", Utc::now())]);
        }
        Ok(Vec::new())
    }

    async fn get_source(&self, _result: &IntegrationResult) -> Result<()> {
        if self.fail_get_source {
            return Err(SourceControlError::Failed(
                "configured to fail GetSource".to_string(),
            ));
        }
        Ok(())
    }

    async fn label_source_control(&self, _result: &IntegrationResult) -> Result<()> {
        if self.fail_label_source_control {
            return Err(SourceControlError::Failed(
                "configured to fail LabelSourceControl".to_string(),
            ));
        }
        Ok(())
    }
}
