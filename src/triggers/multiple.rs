//! Combines several triggers into one.

use chrono::{DateTime, Utc};

use super::Trigger;
use crate::types::IntegrationRequest;

/// How the inner triggers' proposals are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerOperator {
    /// Any inner proposal wins.
    #[default]
    Or,
    /// Every inner trigger must propose a build.
    And,
}

/// A composite over any number of inner triggers.
///
/// All inner triggers are polled on every fire so each keeps its own
/// state moving; the strongest proposed condition is what passes through.
#[derive(Debug, Default)]
pub struct MultipleTrigger {
    triggers: Vec<Trigger>,
    operator: TriggerOperator,
}

impl MultipleTrigger {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        MultipleTrigger {
            triggers,
            operator: TriggerOperator::Or,
        }
    }

    pub fn with_operator(mut self, operator: TriggerOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn fire(&mut self) -> Option<IntegrationRequest> {
        let mut best: Option<IntegrationRequest> = None;
        let mut all_fired = true;

        for trigger in &mut self.triggers {
            match trigger.fire() {
                Some(request) => {
                    let stronger = match &best {
                        Some(current) => request.condition > current.condition,
                        None => true,
                    };
                    if stronger {
                        best = Some(request);
                    }
                }
                None => all_fired = false,
            }
        }

        match self.operator {
            TriggerOperator::Or => best,
            TriggerOperator::And if all_fired => best,
            TriggerOperator::And => None,
        }
    }

    pub fn next_build(&self) -> Option<DateTime<Utc>> {
        self.triggers.iter().filter_map(|t| t.next_build()).min()
    }

    pub fn integration_completed(&mut self) {
        for trigger in &mut self.triggers {
            trigger.integration_completed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::triggers::IntervalTrigger;
    use crate::types::BuildCondition;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::time::Duration;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2004, 12, 1, 10, 0, 0).unwrap(),
        ))
    }

    fn due(clock: &Arc<ManualClock>, condition: BuildCondition) -> Trigger {
        IntervalTrigger::new(Duration::ZERO)
            .with_clock(clock.clone())
            .with_condition(condition)
            .into()
    }

    fn not_due(clock: &Arc<ManualClock>) -> Trigger {
        IntervalTrigger::new(Duration::from_secs(3600))
            .with_clock(clock.clone())
            .into()
    }

    #[test]
    fn or_fires_when_any_inner_fires() {
        let clock = clock();
        let mut trigger = MultipleTrigger::new(vec![
            not_due(&clock),
            due(&clock, BuildCondition::IfModificationExists),
        ]);
        assert!(trigger.fire().is_some());
    }

    #[test]
    fn or_returns_the_strongest_condition() {
        let clock = clock();
        let mut trigger = MultipleTrigger::new(vec![
            due(&clock, BuildCondition::IfModificationExists),
            due(&clock, BuildCondition::ForceBuild),
            due(&clock, BuildCondition::IfModificationExists),
        ]);
        assert_eq!(
            trigger.fire().unwrap().condition,
            BuildCondition::ForceBuild
        );
    }

    #[test]
    fn and_requires_every_inner_to_fire() {
        let clock = clock();
        let mut trigger = MultipleTrigger::new(vec![
            due(&clock, BuildCondition::ForceBuild),
            not_due(&clock),
        ])
        .with_operator(TriggerOperator::And);
        assert!(trigger.fire().is_none());

        clock.advance(chrono::Duration::seconds(3600));
        assert!(trigger.fire().is_some());
    }

    #[test]
    fn next_build_is_the_earliest_inner_deadline() {
        let clock = clock();
        let soon: Trigger = IntervalTrigger::new(Duration::from_secs(60))
            .with_clock(clock.clone())
            .into();
        let later: Trigger = IntervalTrigger::new(Duration::from_secs(600))
            .with_clock(clock.clone())
            .into();
        let trigger = MultipleTrigger::new(vec![later, soon]);

        assert_eq!(
            trigger.next_build(),
            Some(clock.now() + chrono::Duration::seconds(60))
        );
    }

    #[test]
    fn completion_resets_every_inner_trigger() {
        let clock = clock();
        let mut trigger = MultipleTrigger::new(vec![
            due(&clock, BuildCondition::IfModificationExists),
            due(&clock, BuildCondition::ForceBuild),
        ]);
        assert!(trigger.fire().is_some());

        trigger.integration_completed();
        // Zero-interval inner triggers are due again immediately; advance
        // nothing and they still fire, which is the Or contract.
        assert!(trigger.fire().is_some());
    }

    #[test]
    fn empty_composite_never_fires() {
        let mut trigger = MultipleTrigger::new(Vec::new());
        assert!(trigger.fire().is_none());
        assert!(trigger.next_build().is_none());
    }
}
