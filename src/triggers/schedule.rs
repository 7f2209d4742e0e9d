//! Fires once per day at a configured time.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};

use crate::clock::{SharedClock, system_clock};
use crate::types::{BuildCondition, IntegrationRequest, RequestSource};

/// Proposes a build once per day at `time`, optionally restricted to a
/// set of weekdays. All times are UTC.
#[derive(Debug)]
pub struct ScheduleTrigger {
    time: NaiveTime,
    /// Empty means every day.
    weekdays: Vec<Weekday>,
    condition: BuildCondition,
    clock: SharedClock,
    next_build: DateTime<Utc>,
}

impl ScheduleTrigger {
    pub fn new(time: NaiveTime) -> Self {
        let clock = system_clock();
        let next_build = next_occurrence(clock.now(), time, &[]);
        ScheduleTrigger {
            time,
            weekdays: Vec::new(),
            condition: BuildCondition::IfModificationExists,
            clock,
            next_build,
        }
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = weekdays.into_iter().collect();
        self.next_build = next_occurrence(self.clock.now(), self.time, &self.weekdays);
        self
    }

    pub fn with_condition(mut self, condition: BuildCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.next_build = next_occurrence(clock.now(), self.time, &self.weekdays);
        self.clock = clock;
        self
    }

    pub fn fire(&mut self) -> Option<IntegrationRequest> {
        if self.clock.now() < self.next_build {
            return None;
        }
        Some(IntegrationRequest::new(
            self.condition,
            RequestSource::ScheduleTrigger,
        ))
    }

    pub fn next_build(&self) -> Option<DateTime<Utc>> {
        Some(self.next_build)
    }

    pub fn integration_completed(&mut self) {
        // Strictly after now: at most one build per scheduled slot.
        self.next_build = next_occurrence(self.clock.now(), self.time, &self.weekdays);
    }
}

/// First instant at `time` strictly after `now` on an allowed weekday.
fn next_occurrence(now: DateTime<Utc>, time: NaiveTime, weekdays: &[Weekday]) -> DateTime<Utc> {
    let mut date = now.date_naive();
    if now.time() >= time {
        date = date.succ_opt().unwrap_or(date);
    }
    for _ in 0..8 {
        if weekdays.is_empty() || weekdays.contains(&date.weekday()) {
            return date.and_time(time).and_utc();
        }
        date = date.succ_opt().unwrap_or(date);
    }
    date.and_time(time).and_utc()
}
