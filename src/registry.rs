//! Registry of running integrators.
//!
//! The management server resolves project names here, and dependency
//! triggers read sibling project status through the registry's
//! [`ProjectStatusSource`] implementation. The registry is created empty
//! and handles are inserted as integrators start, so a dependency on a
//! project that has not started yet is a lookup error, not a panic.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::integrator::{IntegratorHandle, ProjectSnapshot};
use crate::triggers::{DependencyStatus, ProjectStatusSource, StatusSourceError};
use crate::types::ProjectName;

/// Shared map of project name to integrator handle.
#[derive(Default)]
pub struct ProjectRegistry {
    handles: RwLock<BTreeMap<ProjectName, Arc<IntegratorHandle>>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        ProjectRegistry::default()
    }

    pub fn insert(&self, handle: IntegratorHandle) -> Arc<IntegratorHandle> {
        let handle = Arc::new(handle);
        self.handles
            .write()
            .unwrap()
            .insert(handle.name().clone(), Arc::clone(&handle));
        handle
    }

    pub fn get(&self, project: &ProjectName) -> Option<Arc<IntegratorHandle>> {
        self.handles.read().unwrap().get(project).cloned()
    }

    pub fn names(&self) -> Vec<ProjectName> {
        self.handles.read().unwrap().keys().cloned().collect()
    }

    /// Snapshots every registered project, in name order.
    pub fn snapshot_all(&self) -> Vec<ProjectSnapshot> {
        self.handles
            .read()
            .unwrap()
            .values()
            .map(|handle| handle.snapshot())
            .collect()
    }

    /// Signals every integrator to stop and waits for all of them.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.handles.read().unwrap().values().cloned().collect();
        for handle in &handles {
            handle.stop();
        }
        for handle in &handles {
            handle.wait_stopped().await;
        }
    }
}

impl ProjectStatusSource for ProjectRegistry {
    fn project_status(
        &self,
        project: &ProjectName,
    ) -> Result<DependencyStatus, StatusSourceError> {
        let handle = self
            .get(project)
            .ok_or_else(|| StatusSourceError::UnknownProject(project.clone()))?;
        let last = handle.last_integration();
        Ok(DependencyStatus {
            project: project.clone(),
            status: last.status,
            last_build_time: last.start_time,
            label: last.label,
        })
    }
}
