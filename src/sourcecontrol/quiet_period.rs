//! Quiet-period handling around modification checks.
//!
//! Commits tend to arrive in small bursts. Building the instant the first
//! commit lands risks integrating half a burst, so the quiet period
//! re-polls source control until no modification is newer than the
//! configured delay. Two guard rails keep clock skew from wedging the
//! loop: modifications slightly in the future only produce a warning, and
//! modifications far in the future skip quiet-period processing entirely.
//!
//! The wait is cancellable: a stop or abort can preempt a long quiet
//! period instead of blocking until it elapses.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{SourceControl, SourceControlError};
use crate::clock::{SharedClock, system_clock};
use crate::types::{IntegrationResult, IntegrationSummary, Modification};

/// Below this remaining wait it is not worth applying the quiet period.
const GRACE: Duration = Duration::from_millis(100);

/// Modifications further in the future than this only produce a warning.
const FUTURE_WARN: Duration = Duration::from_secs(10);

/// Modifications further in the future than this skip the quiet period.
const FUTURE_SKIP: Duration = Duration::from_secs(60);

/// Errors from a quiet-period modification check.
#[derive(Debug, Error)]
pub enum QuietPeriodError {
    #[error(transparent)]
    SourceControl(#[from] SourceControlError),

    /// The wait was preempted by a stop or abort.
    #[error("quiet period cancelled")]
    Cancelled,
}

/// Result type for quiet-period operations.
pub type Result<T> = std::result::Result<T, QuietPeriodError>;

/// Applies the modification delay around a source-control poll.
#[derive(Clone)]
pub struct QuietPeriod {
    delay: Duration,
    clock: SharedClock,
}

impl QuietPeriod {
    /// Creates a quiet period with the given modification delay. A zero
    /// delay turns the quiet period into a single plain poll.
    pub fn new(delay: Duration) -> Self {
        QuietPeriod {
            delay,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Polls source control for modifications, re-polling until the burst
    /// has settled.
    ///
    /// `this.start_time` must be marked before calling; it is advanced to
    /// "now" after each wait so the settle arithmetic tracks the re-poll.
    pub async fn get_modifications(
        &self,
        source_control: &dyn SourceControl,
        last: &IntegrationSummary,
        this: &mut IntegrationResult,
        cancel: &CancellationToken,
    ) -> Result<Vec<Modification>> {
        loop {
            let modifications = source_control.get_modifications(last, this).await?;
            match modifications.len() {
                0 => debug!(project = %this.project, "no modifications detected"),
                n => info!(project = %this.project, count = n, "modifications detected"),
            }

            let time_of_this_build = match this.start_time {
                Some(t) => t,
                // Callers mark the start before polling; fall back to now.
                None => self.clock.now(),
            };
            let latest = match Modification::most_recent(&modifications) {
                Some(t) => t,
                // Nothing to settle.
                None => return Ok(modifications),
            };

            let in_the_future = (latest - time_of_this_build)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if in_the_future > FUTURE_WARN {
                warn!(
                    project = %this.project,
                    seconds = in_the_future.as_secs(),
                    "latest modification is in the future; the build server clock \
                     is probably out of sync with the source control server"
                );
            }
            if in_the_future > FUTURE_SKIP {
                warn!(
                    project = %this.project,
                    "modification is more than a minute in the future; \
                     skipping quiet period processing"
                );
                return Ok(modifications);
            }

            let delay = chrono::Duration::from_std(self.delay)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let end_of_quiet_period = latest + delay;
            let wait = (end_of_quiet_period - time_of_this_build)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if wait < GRACE {
                return Ok(modifications);
            }

            info!(
                project = %this.project,
                wait_secs = wait.as_secs_f64(),
                "most recent modification is within the modification delay; \
                 waiting before checking again"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(QuietPeriodError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }

            this.set_start_time(self.clock.now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::test_utils::ScriptedSourceControl;
    use crate::types::{
        BuildCondition, IntegrationRequest, ProjectName, RequestSource,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2004, 12, 1, 10, 30, 0).unwrap()
    }

    fn new_result(start: DateTime<Utc>) -> IntegrationResult {
        let mut result = IntegrationResult::new(
            ProjectName::new("test"),
            "/tmp",
            "/tmp",
            IntegrationRequest::new(BuildCondition::IfModificationExists, RequestSource::Api),
            IntegrationSummary::initial(),
        );
        result.mark_start(start);
        result
    }

    fn modification_at(time: DateTime<Utc>) -> Modification {
        Modification::new("file.rs", "src", time)
    }

    #[tokio::test]
    async fn no_modifications_returns_immediately() {
        let sc = ScriptedSourceControl::returning(vec![Ok(Vec::new())]);
        let quiet = QuietPeriod::new(Duration::from_secs(60));
        let mut result = new_result(start_time());

        let mods = quiet
            .get_modifications(
                &sc,
                &IntegrationSummary::initial(),
                &mut result,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(mods.is_empty());
        assert_eq!(sc.calls(), 1);
    }

    #[tokio::test]
    async fn settled_modifications_skip_the_wait() {
        // Modification older than the delay: nothing to settle.
        let start = start_time();
        let sc = ScriptedSourceControl::returning(vec![Ok(vec![modification_at(
            start - chrono::Duration::seconds(120),
        )])]);
        let quiet = QuietPeriod::new(Duration::from_secs(60));
        let mut result = new_result(start);

        let mods = quiet
            .get_modifications(
                &sc,
                &IntegrationSummary::initial(),
                &mut result,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(mods.len(), 1);
        assert_eq!(sc.calls(), 1);
    }

    #[tokio::test]
    async fn far_future_modification_skips_quiet_period() {
        let start = start_time();
        let sc = ScriptedSourceControl::returning(vec![Ok(vec![modification_at(
            start + chrono::Duration::seconds(120),
        )])]);
        let quiet = QuietPeriod::new(Duration::from_secs(60));
        let mut result = new_result(start);

        let mods = quiet
            .get_modifications(
                &sc,
                &IntegrationSummary::initial(),
                &mut result,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // Escape hatch: returned immediately despite the fresh modification.
        assert_eq!(mods.len(), 1);
        assert_eq!(sc.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn re_polls_until_the_burst_settles() {
        let start = start_time();
        let clock = Arc::new(ManualClock::new(start));

        // Each poll advances the manual clock by the delay, simulating the
        // wall time consumed by the wait between polls.
        let sc = ScriptedSourceControl::returning(vec![
            Ok(vec![modification_at(start)]),
            Ok(vec![modification_at(start)]),
            Ok(vec![modification_at(start)]),
        ])
        .advancing_clock(Arc::clone(&clock), chrono::Duration::seconds(60));

        let quiet =
            QuietPeriod::new(Duration::from_secs(60)).with_clock(clock.clone());
        let mut result = new_result(start);

        let mods = quiet
            .get_modifications(
                &sc,
                &IntegrationSummary::initial(),
                &mut result,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(mods.len(), 1);
        assert!(sc.calls() >= 2, "expected at least one re-poll");
        // The start time advanced with the waits.
        assert!(result.start_time.unwrap() > start);
    }

    #[tokio::test]
    async fn cancellation_preempts_the_wait() {
        let start = start_time();
        let sc = ScriptedSourceControl::returning(vec![Ok(vec![modification_at(start)])]);
        let quiet = QuietPeriod::new(Duration::from_secs(3600));
        let mut result = new_result(start);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = quiet
            .get_modifications(&sc, &IntegrationSummary::initial(), &mut result, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, QuietPeriodError::Cancelled));
    }

    #[tokio::test]
    async fn source_control_errors_propagate() {
        let sc = ScriptedSourceControl::returning(vec![Err(SourceControlError::Failed(
            "doh!".to_string(),
        ))]);
        let quiet = QuietPeriod::new(Duration::from_secs(60));
        let mut result = new_result(start_time());

        let err = quiet
            .get_modifications(
                &sc,
                &IntegrationSummary::initial(),
                &mut result,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, QuietPeriodError::SourceControl(_)));
    }
}
