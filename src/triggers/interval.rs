//! Fires at a fixed interval after each completed integration.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{SharedClock, system_clock};
use crate::types::{BuildCondition, IntegrationRequest, RequestSource};

/// Default interval between builds.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Proposes a build once the configured interval has elapsed since the
/// last completed integration.
#[derive(Debug)]
pub struct IntervalTrigger {
    interval: Duration,
    /// Delay before the very first build after startup. Defaults to the
    /// regular interval.
    initial_interval: Duration,
    condition: BuildCondition,
    clock: SharedClock,
    next_build: DateTime<Utc>,
}

impl IntervalTrigger {
    pub fn new(interval: Duration) -> Self {
        let clock = system_clock();
        let next_build = clock.now() + to_chrono(interval);
        IntervalTrigger {
            interval,
            initial_interval: interval,
            condition: BuildCondition::IfModificationExists,
            clock,
            next_build,
        }
    }

    pub fn with_initial_interval(mut self, initial: Duration) -> Self {
        self.initial_interval = initial;
        self.next_build = self.clock.now() + to_chrono(initial);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.next_build = clock.now() + to_chrono(self.initial_interval);
        self.clock = clock;
        self
    }

    pub fn with_condition(mut self, condition: BuildCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn fire(&mut self) -> Option<IntegrationRequest> {
        if self.clock.now() < self.next_build {
            return None;
        }
        Some(IntegrationRequest::new(
            self.condition,
            RequestSource::IntervalTrigger,
        ))
    }

    pub fn next_build(&self) -> Option<DateTime<Utc>> {
        Some(self.next_build)
    }

    pub fn integration_completed(&mut self) {
        self.next_build = self.clock.now() + to_chrono(self.interval);
    }
}

impl Default for IntervalTrigger {
    fn default() -> Self {
        IntervalTrigger::new(DEFAULT_INTERVAL)
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}
