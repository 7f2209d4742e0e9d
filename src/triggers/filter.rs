//! Suppresses an inner trigger during a time window.
//!
//! The classic use is keeping builds out of a nightly backup window, or
//! out of weekends when composed with a weekday set. Decoration nests:
//! the inner trigger may itself be a filter.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};

use super::Trigger;
use crate::clock::{SharedClock, system_clock};
use crate::types::IntegrationRequest;

const ALL_DAY_START: NaiveTime = NaiveTime::MIN;

/// Filters an inner trigger by a daily time window and a weekday set.
///
/// The window is inclusive at both ends: a fire at exactly the start or
/// end time is suppressed. A window whose end precedes its start crosses
/// midnight. An empty weekday set filters every day.
#[derive(Debug)]
pub struct FilterTrigger {
    inner: Box<Trigger>,
    start_time: NaiveTime,
    end_time: NaiveTime,
    weekdays: Vec<Weekday>,
    clock: SharedClock,
}

impl FilterTrigger {
    pub fn new(inner: impl Into<Trigger>) -> Self {
        FilterTrigger {
            inner: Box::new(inner.into()),
            start_time: ALL_DAY_START,
            end_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(ALL_DAY_START),
            weekdays: Vec::new(),
            clock: system_clock(),
        }
    }

    pub fn with_window(mut self, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = weekdays.into_iter().collect();
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    fn in_window(&self, time: NaiveTime) -> bool {
        if self.start_time <= self.end_time {
            time >= self.start_time && time <= self.end_time
        } else {
            // Crosses midnight.
            time >= self.start_time || time <= self.end_time
        }
    }

    fn day_is_filtered(&self, weekday: Weekday) -> bool {
        self.weekdays.is_empty() || self.weekdays.contains(&weekday)
    }

    fn is_filtered(&self, at: DateTime<Utc>) -> bool {
        self.day_is_filtered(at.weekday()) && self.in_window(at.time())
    }

    pub fn fire(&mut self) -> Option<IntegrationRequest> {
        if self.is_filtered(self.clock.now()) {
            return None;
        }
        self.inner.fire()
    }

    /// The inner trigger's next-build time, clamped to the window end when
    /// it falls inside the filtered window. Only the time of day is
    /// adjusted, never the date.
    pub fn next_build(&self) -> Option<DateTime<Utc>> {
        let inner_next = self.inner.next_build()?;
        if self.is_filtered(inner_next) {
            let clamped = inner_next
                .with_hour(self.end_time.hour())
                .and_then(|t| t.with_minute(self.end_time.minute()))
                .and_then(|t| t.with_second(self.end_time.second()))
                .and_then(|t| t.with_nanosecond(0));
            return Some(clamped.unwrap_or(inner_next));
        }
        Some(inner_next)
    }

    pub fn integration_completed(&mut self) {
        self.inner.integration_completed();
    }
}
