//! TOML configuration.
//!
//! One file describes the server and every project: directories, source
//! control, labeller, trigger tree, task list, publishers. The trigger
//! tables nest the same way the triggers themselves compose, so a filter
//! wrapping an interval is a `[projects.triggers]` table with an `inner`
//! table inside it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Deserialize;
use thiserror::Error;

use crate::label::{DefaultLabeller, IterationLabeller, Labeller, LastChangeLabeller};
use crate::persistence::FileStateManager;
use crate::project::Project;
use crate::publishers::{ArtifactPublisher, LogPublisher, Publisher};
use crate::registry::ProjectRegistry;
use crate::sourcecontrol::{
    FileSystemSourceControl, NullSourceControl, QuietPeriod, SourceControl,
};
use crate::tasks::{ExecTask, Task};
use crate::triggers::{
    FilterTrigger, IntervalTrigger, MultipleTrigger, ProjectTrigger, ScheduleTrigger, Trigger,
};
use crate::types::{BuildCondition, ProjectName};

/// Errors loading or materializing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_quiet_period_seconds() -> u64 {
    60
}

fn default_interval_seconds() -> u64 {
    60
}

/// Top-level configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Address the management API listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Directory holding per-project state files.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Materializes every configured project. Dependency triggers read
    /// sibling status through the given registry.
    pub fn build_projects(&self, registry: &Arc<ProjectRegistry>) -> Result<Vec<Project>> {
        let state_manager = Arc::new(FileStateManager::new(&self.state_dir));
        self.projects
            .iter()
            .map(|p| p.build(Arc::clone(&state_manager), registry))
            .collect()
    }
}

/// One project table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,

    pub working_directory: PathBuf,

    /// Defaults to `<working_directory>/artifacts`.
    pub artifact_directory: Option<PathBuf>,

    #[serde(default = "default_quiet_period_seconds")]
    pub quiet_period_seconds: u64,

    #[serde(default)]
    pub source_control: SourceControlConfig,

    #[serde(default)]
    pub labeller: LabellerConfig,

    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,

    #[serde(default)]
    pub tasks: Vec<TaskConfig>,

    #[serde(default)]
    pub publishers: Vec<PublisherConfig>,
}

impl ProjectConfig {
    fn build(
        &self,
        state_manager: Arc<FileStateManager>,
        registry: &Arc<ProjectRegistry>,
    ) -> Result<Project> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("project name is empty".to_string()));
        }

        let artifact_directory = self
            .artifact_directory
            .clone()
            .unwrap_or_else(|| self.working_directory.join("artifacts"));

        let trigger: Trigger = match self.triggers.len() {
            0 => IntervalTrigger::new(Duration::from_secs(default_interval_seconds())).into(),
            1 => self.triggers[0].build(registry)?,
            _ => {
                let triggers = self
                    .triggers
                    .iter()
                    .map(|t| t.build(registry))
                    .collect::<Result<Vec<_>>>()?;
                MultipleTrigger::new(triggers).into()
            }
        };

        let publishers: Vec<Arc<dyn Publisher>> = if self.publishers.is_empty() {
            vec![Arc::new(LogPublisher::new())]
        } else {
            self.publishers.iter().map(|p| p.build()).collect()
        };

        Ok(Project::new(ProjectName::new(self.name.clone()))
            .with_working_directory(&self.working_directory)
            .with_artifact_directory(artifact_directory)
            .with_source_control(self.source_control.build())
            .with_labeller(self.labeller.build()?)
            .with_tasks(self.tasks.iter().map(|t| t.build()).collect())
            .with_publishers(publishers)
            .with_state_manager(state_manager)
            .with_trigger(trigger)
            .with_quiet_period(QuietPeriod::new(Duration::from_secs(
                self.quiet_period_seconds,
            ))))
    }
}

/// Source-control adapter selection.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceControlConfig {
    Filesystem {
        path: PathBuf,
    },
    Null {
        #[serde(default)]
        always_modified: bool,
    },
}

impl Default for SourceControlConfig {
    fn default() -> Self {
        SourceControlConfig::Null {
            always_modified: false,
        }
    }
}

impl SourceControlConfig {
    fn build(&self) -> Arc<dyn SourceControl> {
        match self {
            SourceControlConfig::Filesystem { path } => {
                Arc::new(FileSystemSourceControl::new(path))
            }
            SourceControlConfig::Null { always_modified } => {
                let mut sc = NullSourceControl::new();
                sc.always_modified = *always_modified;
                Arc::new(sc)
            }
        }
    }
}

/// Labeller selection.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabellerConfig {
    Default {
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        increment_on_failure: bool,
    },
    LastChange {
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        allow_duplicate_subsequent_labels: Option<bool>,
    },
    Iteration {
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        duration_weeks: Option<u32>,
        release_start_date: NaiveDate,
    },
}

impl Default for LabellerConfig {
    fn default() -> Self {
        LabellerConfig::Default {
            prefix: String::new(),
            increment_on_failure: false,
        }
    }
}

impl LabellerConfig {
    fn build(&self) -> Result<Arc<dyn Labeller>> {
        Ok(match self {
            LabellerConfig::Default {
                prefix,
                increment_on_failure,
            } => {
                let mut labeller = DefaultLabeller::new().with_prefix(prefix.clone());
                labeller.increment_on_failure = *increment_on_failure;
                Arc::new(labeller)
            }
            LabellerConfig::LastChange {
                prefix,
                allow_duplicate_subsequent_labels,
            } => {
                let mut labeller = LastChangeLabeller::new().with_prefix(prefix.clone());
                if let Some(allow) = allow_duplicate_subsequent_labels {
                    labeller.allow_duplicate_subsequent_labels = *allow;
                }
                Arc::new(labeller)
            }
            LabellerConfig::Iteration {
                prefix,
                duration_weeks,
                release_start_date,
            } => {
                let mut labeller =
                    IterationLabeller::new(*release_start_date).with_prefix(prefix.clone());
                if let Some(weeks) = duration_weeks {
                    labeller = labeller.with_duration_weeks(*weeks);
                }
                Arc::new(labeller)
            }
        })
    }
}

/// Trigger tree. Decorators nest through `inner`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerConfig {
    Interval {
        #[serde(default = "default_interval_seconds")]
        seconds: u64,
        initial_seconds: Option<u64>,
        #[serde(default)]
        condition: Option<BuildCondition>,
    },
    Schedule {
        time: NaiveTime,
        #[serde(default)]
        weekdays: Vec<String>,
        #[serde(default)]
        condition: Option<BuildCondition>,
    },
    Filter {
        start_time: NaiveTime,
        end_time: NaiveTime,
        #[serde(default)]
        weekdays: Vec<String>,
        inner: Box<TriggerConfig>,
    },
    Project {
        project: String,
        #[serde(default)]
        trigger_status: Option<crate::types::IntegrationStatus>,
        #[serde(default)]
        trigger_first_time: bool,
        inner: Box<TriggerConfig>,
    },
}

fn parse_weekdays(weekdays: &[String]) -> Result<Vec<Weekday>> {
    weekdays
        .iter()
        .map(|day| {
            day.parse::<Weekday>()
                .map_err(|_| ConfigError::Invalid(format!("unknown weekday: {}", day)))
        })
        .collect()
}

impl TriggerConfig {
    fn build(&self, registry: &Arc<ProjectRegistry>) -> Result<Trigger> {
        Ok(match self {
            TriggerConfig::Interval {
                seconds,
                initial_seconds,
                condition,
            } => {
                let mut trigger = IntervalTrigger::new(Duration::from_secs(*seconds));
                if let Some(initial) = initial_seconds {
                    trigger = trigger.with_initial_interval(Duration::from_secs(*initial));
                }
                if let Some(condition) = condition {
                    trigger = trigger.with_condition(*condition);
                }
                trigger.into()
            }
            TriggerConfig::Schedule {
                time,
                weekdays,
                condition,
            } => {
                let mut trigger = ScheduleTrigger::new(*time).with_weekdays(parse_weekdays(weekdays)?);
                if let Some(condition) = condition {
                    trigger = trigger.with_condition(*condition);
                }
                trigger.into()
            }
            TriggerConfig::Filter {
                start_time,
                end_time,
                weekdays,
                inner,
            } => {
                let inner = inner.build(registry)?;
                FilterTrigger::new(inner)
                    .with_window(*start_time, *end_time)
                    .with_weekdays(parse_weekdays(weekdays)?)
                    .into()
            }
            TriggerConfig::Project {
                project,
                trigger_status,
                trigger_first_time,
                inner,
            } => {
                let inner = inner.build(registry)?;
                let mut trigger = ProjectTrigger::new(
                    ProjectName::new(project.clone()),
                    Arc::clone(registry) as _,
                    inner,
                );
                if let Some(status) = trigger_status {
                    trigger = trigger.with_trigger_status(*status);
                }
                if *trigger_first_time {
                    trigger = trigger.triggering_first_time();
                }
                trigger.into()
            }
        })
    }
}

/// Task selection.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskConfig {
    Exec {
        name: String,
        command: String,
        #[serde(default)]
        args: Vec<String>,
        working_directory: Option<PathBuf>,
        timeout_seconds: Option<u64>,
    },
}

impl TaskConfig {
    fn build(&self) -> Arc<dyn Task> {
        match self {
            TaskConfig::Exec {
                name,
                command,
                args,
                working_directory,
                timeout_seconds,
            } => {
                let mut task = ExecTask::new(name.clone(), command.clone())
                    .with_args(args.iter().cloned());
                if let Some(dir) = working_directory {
                    task = task.with_working_directory(dir);
                }
                if let Some(secs) = timeout_seconds {
                    task = task.with_timeout(Duration::from_secs(*secs));
                }
                Arc::new(task)
            }
        }
    }
}

/// Publisher selection.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublisherConfig {
    Log,
    Artifact,
}

impl PublisherConfig {
    fn build(&self) -> Arc<dyn Publisher> {
        match self {
            PublisherConfig::Log => Arc::new(LogPublisher::new()),
            PublisherConfig::Artifact => Arc::new(ArtifactPublisher::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_EXAMPLE: &str = r#"
        listen = "127.0.0.1:4000"
        state_dir = "/var/lib/conductor"

        [[projects]]
        name = "web"
        working_directory = "/srv/web"
        quiet_period_seconds = 30

        [projects.source_control]
        kind = "filesystem"
        path = "/srv/web/src"

        [projects.labeller]
        kind = "default"
        prefix = "v"

        [[projects.triggers]]
        kind = "filter"
        start_time = "23:00:00"
        end_time = "07:00:00"
        weekdays = ["Sat", "Sun"]

        [projects.triggers.inner]
        kind = "interval"
        seconds = 120
        condition = "force_build"

        [[projects.tasks]]
        kind = "exec"
        name = "build"
        command = "cargo"
        args = ["build", "--release"]
        timeout_seconds = 1200

        [[projects.publishers]]
        kind = "artifact"

        [[projects]]
        name = "docs"
        working_directory = "/srv/docs"

        [projects.source_control]
        kind = "null"
        always_modified = true

        [[projects.triggers]]
        kind = "project"
        project = "web"
        trigger_first_time = true

        [projects.triggers.inner]
        kind = "interval"
        seconds = 60
    "#;

    #[test]
    fn full_example_parses_and_builds() {
        let config: Config = toml::from_str(FULL_EXAMPLE).unwrap();
        assert_eq!(config.listen, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.projects.len(), 2);

        let registry = Arc::new(ProjectRegistry::new());
        let projects = config.build_projects(&registry).unwrap();
        assert_eq!(projects[0].name, ProjectName::new("web"));
        assert_eq!(projects[0].tasks.len(), 1);
        assert_eq!(
            projects[0].quiet_period.delay(),
            Duration::from_secs(30)
        );
        assert_eq!(projects[1].name, ProjectName::new("docs"));
    }

    #[test]
    fn minimal_project_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            [[projects]]
            name = "tiny"
            working_directory = "/srv/tiny"
            "#,
        )
        .unwrap();
        assert_eq!(config.listen, default_listen());

        let registry = Arc::new(ProjectRegistry::new());
        let projects = config.build_projects(&registry).unwrap();
        let project = &projects[0];
        assert_eq!(
            project.artifact_directory,
            PathBuf::from("/srv/tiny/artifacts")
        );
        assert_eq!(project.publishers.len(), 1);
        assert!(project.tasks.is_empty());
    }

    #[test]
    fn schedule_trigger_parses_times_and_weekdays() {
        let config: Config = toml::from_str(
            r#"
            [[projects]]
            name = "nightly"
            working_directory = "/srv/nightly"

            [[projects.triggers]]
            kind = "schedule"
            time = "23:30:00"
            weekdays = ["Mon", "Tue", "Wed", "Thu", "Fri"]
            condition = "force_build"
            "#,
        )
        .unwrap();

        let registry = Arc::new(ProjectRegistry::new());
        assert!(config.build_projects(&registry).is_ok());
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [[projects]]
            name = "bad"
            working_directory = "/srv/bad"

            [[projects.triggers]]
            kind = "schedule"
            time = "23:30:00"
            weekdays = ["Noday"]
            "#,
        )
        .unwrap();

        let registry = Arc::new(ProjectRegistry::new());
        let err = config.build_projects(&registry).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn empty_project_name_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [[projects]]
            name = "  "
            working_directory = "/srv/x"
            "#,
        )
        .unwrap();

        let registry = Arc::new(ProjectRegistry::new());
        assert!(config.build_projects(&registry).is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [[projects]]
            name = "x"
            working_directory = "/srv/x"
            surprise = true
            "#,
        );
        assert!(result.is_err());
    }
}
