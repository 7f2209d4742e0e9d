//! File-backed project state.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fsync::write_atomic;
use crate::types::{IntegrationResult, ProjectName};

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from state persistence.
#[derive(Debug, Error)]
pub enum StateError {
    /// No state has been saved for the project.
    #[error("no saved state for project {0}")]
    NotFound(ProjectName),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Persists and retrieves the last integration result per project.
pub trait StateManager: Send + Sync {
    fn load_state(&self, project: &ProjectName) -> Result<IntegrationResult>;

    fn save_state(&self, result: &IntegrationResult) -> Result<()>;

    fn has_previous_state(&self, project: &ProjectName) -> bool;
}

/// On-disk wrapper around a persisted result.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedProjectState {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    result: IntegrationResult,
}

/// Stores one JSON file per project under a state directory.
///
/// Files are written atomically (temp file, fsync, rename, directory
/// fsync) so a crash mid-save leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FileStateManager {
    state_dir: PathBuf,
}

impl FileStateManager {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        FileStateManager {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn path_for(&self, project: &ProjectName) -> PathBuf {
        // Project names come from configuration; escape separators anyway
        // so a hostile name cannot escape the state directory.
        let safe: String = project
            .as_str()
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.state_dir.join(format!("{}.json", safe))
    }
}

impl StateManager for FileStateManager {
    fn load_state(&self, project: &ProjectName) -> Result<IntegrationResult> {
        let path = self.path_for(project);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StateError::NotFound(project.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let persisted: PersistedProjectState = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != SCHEMA_VERSION {
            return Err(StateError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                got: persisted.schema_version,
            });
        }
        Ok(persisted.result)
    }

    fn save_state(&self, result: &IntegrationResult) -> Result<()> {
        let persisted = PersistedProjectState {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            result: result.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        write_atomic(&self.path_for(&result.project), &bytes)?;
        Ok(())
    }

    fn has_previous_state(&self, project: &ProjectName) -> bool {
        self.path_for(project).exists()
    }
}
