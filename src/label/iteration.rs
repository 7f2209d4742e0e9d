//! Iteration-based labelling.

use chrono::NaiveDate;

use super::{Labeller, split_trailing_number};
use crate::clock::{SharedClock, system_clock};
use crate::types::{IntegrationResult, IntegrationStatus};

const DAYS_IN_WEEK: i64 = 7;
const INITIAL_BUILD: u64 = 1;

/// Labels builds `<prefix><separator><iteration><separator><build>`.
///
/// The iteration number counts fixed-length iterations since the release
/// start date: with a start of June 1 and two-week iterations, July 1
/// falls in iteration 2. The build number increments within an iteration
/// and resets to 1 when a new iteration begins.
#[derive(Debug, Clone)]
pub struct IterationLabeller {
    pub prefix: String,
    /// Iteration length in weeks.
    pub duration_weeks: u32,
    pub release_start_date: NaiveDate,
    pub separator: String,
    clock: SharedClock,
}

impl IterationLabeller {
    pub fn new(release_start_date: NaiveDate) -> Self {
        IterationLabeller {
            prefix: String::new(),
            duration_weeks: 2,
            release_start_date,
            separator: ".".to_string(),
            clock: system_clock(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_duration_weeks(mut self, weeks: u32) -> Self {
        self.duration_weeks = weeks.max(1);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    fn current_iteration(&self) -> i64 {
        let today = self.clock.now().date_naive();
        let days = (today - self.release_start_date).num_days();
        days / (i64::from(self.duration_weeks) * DAYS_IN_WEEK)
    }

    fn new_label(&self, build: u64) -> String {
        let mut label = self.prefix.clone();
        if !label.is_empty() && !label.ends_with(&self.separator) {
            label.push_str(&self.separator);
        }
        format!(
            "{}{}{}{}",
            label,
            self.current_iteration(),
            self.separator,
            build
        )
    }

    /// The next build number, resetting when the iteration has moved on
    /// since the label was generated.
    fn increment(&self, label: &str) -> u64 {
        let Some((rest, build)) = split_trailing_number(label) else {
            return INITIAL_BUILD;
        };
        let iteration = rest
            .trim_end_matches(&self.separator)
            .rsplit(&self.separator)
            .next()
            .and_then(|s| s.parse::<i64>().ok());
        match iteration {
            Some(iteration) if iteration < self.current_iteration() => INITIAL_BUILD,
            _ => build + 1,
        }
    }
}

impl Labeller for IterationLabeller {
    fn generate(&self, result: &IntegrationResult) -> String {
        let last = &result.last_integration;
        match last.label.as_deref() {
            None => self.new_label(INITIAL_BUILD),
            Some(label) if last.status == IntegrationStatus::Success => {
                self.new_label(self.increment(label))
            }
            Some(label) => label.to_string(),
        }
    }
}
