//! In-memory state, for tests and throwaway projects.

use std::collections::HashMap;
use std::sync::Mutex;

use super::state_manager::{Result, StateError, StateManager};
use crate::types::{IntegrationResult, ProjectName};

/// Keeps project state in a map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStateManager {
    states: Mutex<HashMap<ProjectName, IntegrationResult>>,
}

impl MemoryStateManager {
    pub fn new() -> Self {
        MemoryStateManager::default()
    }

    /// Pre-seeds state for a project, as if it had been saved earlier.
    pub fn seeded_with(result: IntegrationResult) -> Self {
        let manager = MemoryStateManager::new();
        manager
            .states
            .lock()
            .unwrap()
            .insert(result.project.clone(), result);
        manager
    }
}

impl StateManager for MemoryStateManager {
    fn load_state(&self, project: &ProjectName) -> Result<IntegrationResult> {
        self.states
            .lock()
            .unwrap()
            .get(project)
            .cloned()
            .ok_or_else(|| StateError::NotFound(project.clone()))
    }

    fn save_state(&self, result: &IntegrationResult) -> Result<()> {
        self.states
            .lock()
            .unwrap()
            .insert(result.project.clone(), result.clone());
        Ok(())
    }

    fn has_previous_state(&self, project: &ProjectName) -> bool {
        self.states.lock().unwrap().contains_key(project)
    }
}
