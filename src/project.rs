//! A configured project: directories plus collaborators.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::label::{DefaultLabeller, Labeller};
use crate::persistence::{MemoryStateManager, StateManager};
use crate::publishers::{LogPublisher, Publisher};
use crate::sourcecontrol::{NullSourceControl, QuietPeriod, SourceControl};
use crate::tasks::Task;
use crate::triggers::{IntervalTrigger, Trigger};
use crate::types::ProjectName;

/// Everything the integrator needs to drive one project.
///
/// Collaborators default to the no-op implementations (null source
/// control, default labeller, in-memory state, log publisher, one-minute
/// interval trigger) so tests and minimal configurations only override
/// what they care about.
pub struct Project {
    pub name: ProjectName,
    pub working_directory: PathBuf,
    pub artifact_directory: PathBuf,
    pub source_control: Arc<dyn SourceControl>,
    pub labeller: Arc<dyn Labeller>,
    pub tasks: Vec<Arc<dyn Task>>,
    pub publishers: Vec<Arc<dyn Publisher>>,
    pub state_manager: Arc<dyn StateManager>,
    pub trigger: Trigger,
    pub quiet_period: QuietPeriod,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("working_directory", &self.working_directory)
            .field("artifact_directory", &self.artifact_directory)
            .field("tasks", &self.tasks.len())
            .field("publishers", &self.publishers.len())
            .field("trigger", &self.trigger)
            .finish()
    }
}

impl Project {
    pub fn new(name: impl Into<ProjectName>) -> Self {
        Project {
            name: name.into(),
            working_directory: PathBuf::from("."),
            artifact_directory: PathBuf::from("."),
            source_control: Arc::new(NullSourceControl::new()),
            labeller: Arc::new(DefaultLabeller::new()),
            tasks: Vec::new(),
            publishers: vec![Arc::new(LogPublisher::new())],
            state_manager: Arc::new(MemoryStateManager::new()),
            trigger: IntervalTrigger::default().into(),
            quiet_period: QuietPeriod::new(Duration::ZERO),
        }
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn with_artifact_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_directory = dir.into();
        self
    }

    pub fn with_source_control(mut self, source_control: Arc<dyn SourceControl>) -> Self {
        self.source_control = source_control;
        self
    }

    pub fn with_labeller(mut self, labeller: Arc<dyn Labeller>) -> Self {
        self.labeller = labeller;
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<Arc<dyn Task>>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_publishers(mut self, publishers: Vec<Arc<dyn Publisher>>) -> Self {
        self.publishers = publishers;
        self
    }

    pub fn with_state_manager(mut self, state_manager: Arc<dyn StateManager>) -> Self {
        self.state_manager = state_manager;
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<Trigger>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn with_quiet_period(mut self, quiet_period: QuietPeriod) -> Self {
        self.quiet_period = quiet_period;
        self
    }
}
