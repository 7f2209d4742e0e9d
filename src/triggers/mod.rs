//! Trigger policy objects.
//!
//! A trigger decides *when* a build should be proposed; it knows nothing
//! about the request queue that carries its output. Triggers compose by
//! decoration - a filter can wrap a filter wrapping an interval - with
//! arbitrary depth. The composition is a tagged enum over the concrete
//! trigger kinds, dispatched by match; decorators box their inner
//! trigger, so no trait objects are involved.

use chrono::{DateTime, Utc};

use crate::types::IntegrationRequest;

pub mod filter;
pub mod interval;
pub mod multiple;
pub mod project;
pub mod schedule;

pub use filter::FilterTrigger;
pub use interval::IntervalTrigger;
pub use multiple::{MultipleTrigger, TriggerOperator};
pub use project::{DependencyStatus, ProjectStatusSource, ProjectTrigger, StatusSourceError};
pub use schedule::ScheduleTrigger;

/// A build-proposal policy.
#[derive(Debug)]
pub enum Trigger {
    Interval(IntervalTrigger),
    Schedule(ScheduleTrigger),
    Filter(FilterTrigger),
    Project(ProjectTrigger),
    Multiple(MultipleTrigger),
}

impl Trigger {
    /// Proposes a build, or `None` if this trigger has nothing to say
    /// right now. Idempotent until the proposal is consumed: a trigger
    /// keeps proposing until [`Trigger::integration_completed`] tells it
    /// the cycle finished.
    pub fn fire(&mut self) -> Option<IntegrationRequest> {
        match self {
            Trigger::Interval(t) => t.fire(),
            Trigger::Schedule(t) => t.fire(),
            Trigger::Filter(t) => t.fire(),
            Trigger::Project(t) => t.fire(),
            Trigger::Multiple(t) => t.fire(),
        }
    }

    /// When this trigger next wants to be polled, if it knows.
    pub fn next_build(&self) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Interval(t) => t.next_build(),
            Trigger::Schedule(t) => t.next_build(),
            Trigger::Filter(t) => t.next_build(),
            Trigger::Project(t) => t.next_build(),
            Trigger::Multiple(t) => t.next_build(),
        }
    }

    /// Notifies the trigger that a build cycle finished (whether or not a
    /// build actually ran), so interval-style triggers can reset.
    pub fn integration_completed(&mut self) {
        match self {
            Trigger::Interval(t) => t.integration_completed(),
            Trigger::Schedule(t) => t.integration_completed(),
            Trigger::Filter(t) => t.integration_completed(),
            Trigger::Project(t) => t.integration_completed(),
            Trigger::Multiple(t) => t.integration_completed(),
        }
    }
}

impl From<IntervalTrigger> for Trigger {
    fn from(t: IntervalTrigger) -> Self {
        Trigger::Interval(t)
    }
}

impl From<ScheduleTrigger> for Trigger {
    fn from(t: ScheduleTrigger) -> Self {
        Trigger::Schedule(t)
    }
}

impl From<FilterTrigger> for Trigger {
    fn from(t: FilterTrigger) -> Self {
        Trigger::Filter(t)
    }
}

impl From<ProjectTrigger> for Trigger {
    fn from(t: ProjectTrigger) -> Self {
        Trigger::Project(t)
    }
}

impl From<MultipleTrigger> for Trigger {
    fn from(t: MultipleTrigger) -> Self {
        Trigger::Multiple(t)
    }
}
