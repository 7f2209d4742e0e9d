//! The project integration loop.
//!
//! One tokio task per project. The loop races two wakeup sources: the
//! request queue (forced builds, remote requests) and the trigger's
//! next-build deadline. Whichever wins, the cycle runs to completion
//! before the loop looks again - a failing task or collaborator is
//! recorded on the result, never allowed to corrupt queue or trigger
//! state.
//!
//! # Cancellation scopes
//!
//! Two scopes exist per cycle:
//! - the shutdown token (from `stop()`) preempts quiet-period waits and
//!   exits the loop after the current cycle, but never kills a running
//!   build;
//! - the per-cycle abort token (from `abort()`) cooperatively terminates
//!   the quiet-period wait and the in-flight task pipeline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::queue::BuildRequestQueue;
use super::status::{ProjectSnapshot, StatusCell};
use crate::clock::{SharedClock, system_clock};
use crate::project::Project;
use crate::sourcecontrol::QuietPeriodError;
use crate::tasks::TaskError;
use crate::types::{
    BuildCondition, BuildParameters, BuildRequest, IntegrationRequest, IntegrationResult,
    IntegrationStatus, IntegrationSummary, IntegratorState, ProjectActivity, ProjectName,
    TaskResult,
};

/// When the trigger has nothing to propose despite being due, re-poll at
/// this pace instead of spinning.
const IDLE_POLL: Duration = Duration::from_secs(1);

/// How one integration cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The pipeline ran and the result was recorded.
    Completed(IntegrationStatus),
    /// Nothing to do: no modifications and the build was not forced.
    Skipped,
    /// Fetching modifications failed; the error was recorded and the
    /// previous baseline preserved.
    SourceControlError,
    /// A stop or abort preempted the cycle before the build started.
    Cancelled,
}

/// Drives one project through its integration life-cycle.
pub struct ProjectIntegrator {
    project: Project,
    queue: Arc<BuildRequestQueue>,
    status: Arc<StatusCell>,
    clock: SharedClock,
    abort_slot: Arc<Mutex<CancellationToken>>,
    last_integration: IntegrationSummary,
}

impl ProjectIntegrator {
    /// Creates an integrator, resuming from persisted state if present.
    pub fn new(project: Project) -> Self {
        let status = Arc::new(StatusCell::new(project.name.clone()));

        let last_integration = if project.state_manager.has_previous_state(&project.name) {
            match project.state_manager.load_state(&project.name) {
                Ok(result) => result.summary(),
                Err(e) => {
                    warn!(
                        project = %project.name,
                        error = %e,
                        "could not load saved state; starting fresh"
                    );
                    IntegrationSummary::initial()
                }
            }
        } else {
            IntegrationSummary::initial()
        };
        status.seed_last(last_integration.clone());

        ProjectIntegrator {
            project,
            queue: Arc::new(BuildRequestQueue::new()),
            status,
            clock: system_clock(),
            abort_slot: Arc::new(Mutex::new(CancellationToken::new())),
            last_integration,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn queue(&self) -> Arc<BuildRequestQueue> {
        Arc::clone(&self.queue)
    }

    pub fn status(&self) -> Arc<StatusCell> {
        Arc::clone(&self.status)
    }

    pub fn last_integration(&self) -> &IntegrationSummary {
        &self.last_integration
    }

    /// Spawns the integration loop and returns the control handle.
    pub fn start(self) -> IntegratorHandle {
        let shutdown = CancellationToken::new();
        let name = self.project.name.clone();
        let queue = Arc::clone(&self.queue);
        let status = Arc::clone(&self.status);
        let abort_slot = Arc::clone(&self.abort_slot);

        let join = tokio::spawn(self.run(shutdown.clone()));

        IntegratorHandle {
            name,
            queue,
            status,
            shutdown,
            abort_slot,
            join: Mutex::new(Some(join)),
        }
    }

    /// The integration loop. Exits when `shutdown` is cancelled, after
    /// finishing any cycle in progress.
    #[instrument(skip(self, shutdown), fields(project = %self.project.name))]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("integrator started");
        self.status.set_state(IntegratorState::Running);

        // When the trigger declined to propose anything despite being
        // due, back off instead of spinning on a stale deadline.
        let mut idle_backoff = false;

        // Local handle so the select future borrows the queue, not self.
        let queue = Arc::clone(&self.queue);

        loop {
            let wait = self.trigger_wait(idle_backoff);

            tokio::select! {
                _ = shutdown.cancelled() => break,

                request = queue.wait_for_request() => {
                    idle_backoff = false;
                    self.integrate(request.into_integration_request(), &shutdown).await;
                }

                _ = async {
                    match wait {
                        Some(duration) => tokio::time::sleep(duration).await,
                        None => std::future::pending().await,
                    }
                } => {
                    match self.project.trigger.fire() {
                        Some(mut request) => {
                            idle_backoff = false;
                            // A queued request of equal or higher priority
                            // outranks the trigger (it carries requester
                            // attribution and parameters).
                            if let Some(pending) = self.queue.take_pending()
                                && pending.condition >= request.condition
                            {
                                request = pending.into_integration_request();
                            }
                            self.integrate(request, &shutdown).await;
                        }
                        None => idle_backoff = true,
                    }
                }
            }
        }

        self.status.set_activity(ProjectActivity::Sleeping);
        self.status.set_state(IntegratorState::Stopped);
        info!("integrator stopped");
    }

    /// Time until the trigger's next-build deadline. `None` means the
    /// trigger has no deadline and only queue requests can wake the loop.
    fn trigger_wait(&self, idle_backoff: bool) -> Option<Duration> {
        let deadline = self.project.trigger.next_build()?;
        let remaining = (deadline - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if idle_backoff {
            Some(remaining.max(IDLE_POLL))
        } else {
            Some(remaining)
        }
    }

    /// Runs one integration cycle to completion.
    pub async fn integrate(
        &mut self,
        request: IntegrationRequest,
        shutdown: &CancellationToken,
    ) -> CycleOutcome {
        let cycle_abort = CancellationToken::new();
        *self.abort_slot.lock().unwrap() = cycle_abort.clone();

        info!(
            condition = %request.condition,
            source = %request.source,
            "integration cycle starting"
        );
        self.status.set_activity(ProjectActivity::CheckingModifications);

        let mut result = IntegrationResult::new(
            self.project.name.clone(),
            self.project.working_directory.clone(),
            self.project.artifact_directory.clone(),
            request,
            self.last_integration.clone(),
        );
        result.mark_start(self.clock.now());

        // The quiet-period wait is preemptable by both stop and abort.
        let modifications = tokio::select! {
            _ = shutdown.cancelled() => Err(QuietPeriodError::Cancelled),
            polled = self.project.quiet_period.get_modifications(
                self.project.source_control.as_ref(),
                &self.last_integration,
                &mut result,
                &cycle_abort,
            ) => polled,
        };

        let modifications = match modifications {
            Ok(modifications) => modifications,
            Err(QuietPeriodError::Cancelled) => {
                debug!("modification check preempted");
                self.finish_cycle();
                return CycleOutcome::Cancelled;
            }
            Err(QuietPeriodError::SourceControl(e)) => {
                warn!(error = %e, "could not fetch modifications");
                return self.record_source_control_error(result, e.to_string()).await;
            }
        };
        result.modifications = modifications;

        if !result.should_run_build() {
            debug!("no modifications; skipping build");
            self.finish_cycle();
            return CycleOutcome::Skipped;
        }

        // The label is generated from the predecessor summary before any
        // task runs, so tasks can bake it into their output.
        result.label = self.project.labeller.generate(&result);

        if let Err(e) = self.project.source_control.get_source(&result).await {
            warn!(error = %e, "get source failed");
            result.exception = Some(format!("get source: {}", e));
        }

        if result.exception.is_none() {
            self.status.set_activity(ProjectActivity::Building);
            self.run_pipeline(&mut result, &cycle_abort).await;
        }

        result.mark_end(self.clock.now());
        result.finalize_status();

        self.complete(result).await
    }

    /// Runs the task pipeline, stopping at the first failure, error, or
    /// abort. Everything that happened is captured on the result.
    async fn run_pipeline(&self, result: &mut IntegrationResult, cycle_abort: &CancellationToken) {
        let mut aborted = false;

        for task in &self.project.tasks {
            if cycle_abort.is_cancelled() {
                aborted = true;
                break;
            }
            match task.run(result, cycle_abort).await {
                Ok(task_result) => {
                    let failed = !task_result.succeeded;
                    if failed {
                        warn!(task = task.name(), "task failed");
                    }
                    result.task_results.push(task_result);
                    if failed {
                        break;
                    }
                }
                Err(TaskError::Aborted) => {
                    result
                        .task_results
                        .push(TaskResult::failure(task.name(), "aborted"));
                    aborted = true;
                    break;
                }
                Err(e) => {
                    error!(task = task.name(), error = %e, "task errored");
                    result.exception = Some(format!("task {}: {}", task.name(), e));
                    break;
                }
            }
        }

        if aborted {
            info!("build aborted");
            // Partial output stays on the result; the outcome is a
            // failure, not an exception.
            result.exception = None;
        }
    }

    /// Finalizes a cycle whose modification fetch failed.
    ///
    /// The error is recorded and published, but the result is NOT saved
    /// and the in-memory baseline is NOT advanced: label generation for
    /// subsequent builds must keep treating the last successful result as
    /// its baseline, not this half-built one.
    async fn record_source_control_error(
        &mut self,
        mut result: IntegrationResult,
        error: String,
    ) -> CycleOutcome {
        result.source_control_error = Some(error);
        // Carry the previous label so observers keep seeing it.
        result.label = self
            .last_integration
            .label
            .clone()
            .unwrap_or_default();
        result.mark_end(self.clock.now());
        result.finalize_status();

        self.status.set_activity(ProjectActivity::Publishing);
        self.publish(&result).await;
        self.status.record_outcome(result.summary());
        self.finish_cycle();
        CycleOutcome::SourceControlError
    }

    /// Persists, publishes, and records a completed integration.
    async fn complete(&mut self, result: IntegrationResult) -> CycleOutcome {
        self.status.set_activity(ProjectActivity::Publishing);

        if let Err(e) = self.project.state_manager.save_state(&result) {
            // Survive and retry next cycle; the in-memory chain continues.
            error!(error = %e, "failed to persist integration state");
        }

        if result.succeeded()
            && let Err(e) = self.project.source_control.label_source_control(&result).await
        {
            warn!(error = %e, "labelling source control failed");
        }

        self.publish(&result).await;

        self.last_integration = result.summary();
        self.status.record_outcome(self.last_integration.clone());
        self.finish_cycle();

        info!(
            label = %result.label,
            status = %result.status,
            fixed = result.fixed(),
            "integration cycle finished"
        );
        CycleOutcome::Completed(result.status)
    }

    async fn publish(&self, result: &IntegrationResult) {
        for publisher in &self.project.publishers {
            if let Err(e) = publisher.publish(result).await {
                warn!(publisher = publisher.name(), error = %e, "publisher failed");
            }
        }
    }

    /// Returns the integrator to its between-cycles posture.
    fn finish_cycle(&mut self) {
        self.project.trigger.integration_completed();
        self.status.set_activity(ProjectActivity::Sleeping);
    }
}

/// External control surface for a started integrator.
///
/// All operations are cheap and non-blocking except [`wait_stopped`],
/// which awaits loop exit.
///
/// [`wait_stopped`]: IntegratorHandle::wait_stopped
pub struct IntegratorHandle {
    name: ProjectName,
    queue: Arc<BuildRequestQueue>,
    status: Arc<StatusCell>,
    shutdown: CancellationToken,
    abort_slot: Arc<Mutex<CancellationToken>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl IntegratorHandle {
    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// Current externally visible view of the project.
    pub fn snapshot(&self) -> ProjectSnapshot {
        self.status
            .snapshot(self.queue.has_pending_request(), self.queue.len())
    }

    pub fn last_integration(&self) -> IntegrationSummary {
        self.status.last_integration()
    }

    /// Requests a forced build, optionally on behalf of a user.
    pub fn force_build(&self, user: Option<String>, parameters: BuildParameters) -> bool {
        let request = match user {
            Some(user) => BuildRequest::forced(user, parameters),
            None => {
                let mut request = BuildRequest::new(BuildCondition::ForceBuild);
                request.parameters = parameters;
                request
            }
        };
        self.queue.request_build(request)
    }

    /// Enqueues a build request with the given condition.
    pub fn request(&self, condition: BuildCondition) -> bool {
        self.queue.request_build(BuildRequest::new(condition))
    }

    /// Drops the pending request, if any.
    pub fn cancel_pending_request(&self) -> bool {
        self.queue.cancel_pending()
    }

    /// Cooperatively terminates the build in progress, if any.
    pub fn abort(&self) {
        self.abort_slot.lock().unwrap().cancel();
    }

    /// Asks the loop to exit after the current cycle.
    pub fn stop(&self) {
        if self.status.state() == IntegratorState::Running {
            self.status.set_state(IntegratorState::Stopping);
        }
        self.shutdown.cancel();
    }

    /// Waits for the loop to fully stop. Call after [`stop`].
    ///
    /// [`stop`]: IntegratorHandle::stop
    pub async fn wait_stopped(&self) {
        let join = self.join.lock().unwrap().take();
        if let Some(join) = join {
            if let Err(e) = join.await {
                error!(project = %self.name, error = %e, "integrator task panicked");
            }
        }
    }
}
