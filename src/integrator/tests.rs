//! Cross-component tests for the integration state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::ManualClock;
use crate::integrator::{CycleOutcome, ProjectIntegrator};
use crate::persistence::{FileStateManager, MemoryStateManager, StateManager};
use crate::project::Project;
use crate::sourcecontrol::SourceControlError;
use crate::test_utils::{BlockingTask, CountingPublisher, RecordingTask, ScriptedSourceControl};
use crate::triggers::IntervalTrigger;
use crate::types::{
    BuildCondition, IntegrationRequest, IntegrationResult, IntegrationStatus, IntegrationSummary,
    IntegratorState, Modification, ProjectActivity, ProjectName, RequestSource,
};
use chrono::Utc;

fn force_request() -> IntegrationRequest {
    IntegrationRequest::new(BuildCondition::ForceBuild, RequestSource::Api)
}

fn modification() -> Modification {
    Modification::new("a.rs", "src", Utc::now())
}

fn one_modification() -> Result<Vec<Modification>, SourceControlError> {
    Ok(vec![modification()])
}

fn sc_error() -> Result<Vec<Modification>, SourceControlError> {
    Err(SourceControlError::Failed("doh!".to_string()))
}

/// A result as a previous run would have persisted it.
fn saved_result(project: &str, label: &str, status: IntegrationStatus) -> IntegrationResult {
    let mut result = IntegrationResult::new(
        ProjectName::new(project),
        "/tmp",
        "/tmp",
        force_request(),
        IntegrationSummary::initial(),
    );
    result.label = label.to_string();
    result.status = status;
    result
}

// ─── Label progression across failures ───

#[tokio::test]
async fn label_sequence_survives_an_initial_modification_fetch_failure() {
    let source_control = Arc::new(ScriptedSourceControl::returning(vec![
        sc_error(),
        one_modification(),
    ]));
    let project = Project::new("test").with_source_control(source_control);
    let mut integrator = ProjectIntegrator::new(project);
    let shutdown = CancellationToken::new();

    let first = integrator.integrate(force_request(), &shutdown).await;
    assert_eq!(first, CycleOutcome::SourceControlError);

    let second = integrator.integrate(force_request(), &shutdown).await;
    assert_eq!(second, CycleOutcome::Completed(IntegrationStatus::Success));
    assert_eq!(integrator.last_integration().label.as_deref(), Some("1"));
}

#[tokio::test]
async fn modification_fetch_failure_does_not_reset_the_label_baseline() {
    let state_manager = Arc::new(MemoryStateManager::seeded_with(saved_result(
        "test",
        "10",
        IntegrationStatus::Success,
    )));
    let source_control = Arc::new(ScriptedSourceControl::returning(vec![
        sc_error(),
        one_modification(),
    ]));
    let project = Project::new("test")
        .with_source_control(source_control)
        .with_state_manager(state_manager);
    let mut integrator = ProjectIntegrator::new(project);
    let shutdown = CancellationToken::new();

    assert_eq!(
        integrator.integrate(force_request(), &shutdown).await,
        CycleOutcome::SourceControlError
    );
    assert_eq!(
        integrator.integrate(force_request(), &shutdown).await,
        CycleOutcome::Completed(IntegrationStatus::Success)
    );
    assert_eq!(integrator.last_integration().label.as_deref(), Some("11"));
}

#[tokio::test]
async fn modification_fetch_failure_is_published_but_not_persisted() {
    let publisher = Arc::new(CountingPublisher::new());
    let state_manager = Arc::new(MemoryStateManager::new());
    let source_control = Arc::new(ScriptedSourceControl::returning(vec![sc_error()]));
    let project = Project::new("test")
        .with_source_control(source_control)
        .with_state_manager(Arc::clone(&state_manager) as Arc<dyn StateManager>)
        .with_publishers(vec![Arc::clone(&publisher) as _]);
    let mut integrator = ProjectIntegrator::new(project);

    integrator
        .integrate(force_request(), &CancellationToken::new())
        .await;

    // Observable, but the saved baseline is untouched.
    assert_eq!(publisher.publishes(), 1);
    assert!(!state_manager.has_previous_state(&ProjectName::new("test")));
    assert_eq!(
        integrator.status().snapshot(false, 0).last_status,
        IntegrationStatus::Exception
    );
    assert!(integrator.last_integration().is_initial());
}

// ─── Skip and force semantics ───

#[tokio::test]
async fn no_modifications_skips_the_build_and_records_nothing() {
    let state_manager = Arc::new(MemoryStateManager::new());
    let task = Arc::new(RecordingTask::succeeding("build"));
    let project = Project::new("test")
        .with_state_manager(Arc::clone(&state_manager) as Arc<dyn StateManager>)
        .with_tasks(vec![Arc::clone(&task) as _]);
    let mut integrator = ProjectIntegrator::new(project);

    let outcome = integrator
        .integrate(
            IntegrationRequest::new(BuildCondition::IfModificationExists, RequestSource::Api),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, CycleOutcome::Skipped);
    assert_eq!(task.runs(), 0);
    assert!(!state_manager.has_previous_state(&ProjectName::new("test")));
    assert_eq!(
        integrator.status().activity(),
        ProjectActivity::Sleeping
    );
}

#[tokio::test]
async fn forced_build_runs_with_zero_modifications() {
    let task = Arc::new(RecordingTask::succeeding("build"));
    let project = Project::new("test").with_tasks(vec![Arc::clone(&task) as _]);
    let mut integrator = ProjectIntegrator::new(project);

    let outcome = integrator
        .integrate(force_request(), &CancellationToken::new())
        .await;

    assert_eq!(outcome, CycleOutcome::Completed(IntegrationStatus::Success));
    assert_eq!(task.runs(), 1);
    assert_eq!(integrator.last_integration().label.as_deref(), Some("1"));
}

// ─── Pipeline failure containment ───

#[tokio::test]
async fn failing_task_finalizes_the_result_and_stops_the_pipeline() {
    let failing = Arc::new(RecordingTask::scripted("build", vec![Ok(false)]));
    let skipped = Arc::new(RecordingTask::succeeding("test"));
    let project = Project::new("test")
        .with_tasks(vec![Arc::clone(&failing) as _, Arc::clone(&skipped) as _]);
    let mut integrator = ProjectIntegrator::new(project);

    let outcome = integrator
        .integrate(force_request(), &CancellationToken::new())
        .await;

    assert_eq!(outcome, CycleOutcome::Completed(IntegrationStatus::Failure));
    assert_eq!(skipped.runs(), 0, "pipeline stops at the first failure");

    // A failing task corrupts nothing: the next cycle runs normally.
    let outcome = integrator
        .integrate(force_request(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, CycleOutcome::Completed(IntegrationStatus::Success));
}

#[tokio::test]
async fn erroring_task_becomes_an_exception_result() {
    let erroring = Arc::new(RecordingTask::scripted("build", vec![Err(())]));
    let project = Project::new("test").with_tasks(vec![Arc::clone(&erroring) as _]);
    let mut integrator = ProjectIntegrator::new(project);

    let outcome = integrator
        .integrate(force_request(), &CancellationToken::new())
        .await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed(IntegrationStatus::Exception)
    );
}

#[tokio::test]
async fn failed_build_does_not_advance_the_label() {
    let project = Project::new("test")
        .with_tasks(vec![Arc::new(RecordingTask::scripted(
            "build",
            vec![Ok(false), Ok(true)],
        )) as _]);
    let mut integrator = ProjectIntegrator::new(project);
    let shutdown = CancellationToken::new();

    integrator.integrate(force_request(), &shutdown).await;
    assert_eq!(integrator.last_integration().label.as_deref(), Some("1"));
    assert_eq!(
        integrator.last_integration().status,
        IntegrationStatus::Failure
    );

    // The repaired build re-uses the number the failure burned.
    integrator.integrate(force_request(), &shutdown).await;
    assert_eq!(integrator.last_integration().label.as_deref(), Some("1"));
    assert_eq!(
        integrator.last_integration().status,
        IntegrationStatus::Success
    );
}

#[tokio::test]
async fn publisher_failure_does_not_fail_the_integration() {
    let publisher = Arc::new(CountingPublisher::failing());
    let state_manager = Arc::new(MemoryStateManager::new());
    let project = Project::new("test")
        .with_publishers(vec![Arc::clone(&publisher) as _])
        .with_state_manager(Arc::clone(&state_manager) as Arc<dyn StateManager>);
    let mut integrator = ProjectIntegrator::new(project);

    let outcome = integrator
        .integrate(force_request(), &CancellationToken::new())
        .await;

    assert_eq!(outcome, CycleOutcome::Completed(IntegrationStatus::Success));
    assert_eq!(publisher.publishes(), 1);
    assert!(state_manager.has_previous_state(&ProjectName::new("test")));
}

// ─── Resume from persisted state ───

#[tokio::test]
async fn integrator_resumes_from_saved_state() {
    let dir = tempfile::tempdir().unwrap();
    let state_manager = Arc::new(FileStateManager::new(dir.path()));
    state_manager
        .save_state(&saved_result("test", "5", IntegrationStatus::Success))
        .unwrap();

    let source_control = Arc::new(ScriptedSourceControl::returning(vec![one_modification()]));
    let project = Project::new("test")
        .with_source_control(source_control)
        .with_state_manager(Arc::clone(&state_manager) as Arc<dyn StateManager>);
    let mut integrator = ProjectIntegrator::new(project);

    assert_eq!(integrator.last_integration().label.as_deref(), Some("5"));

    integrator
        .integrate(force_request(), &CancellationToken::new())
        .await;
    assert_eq!(integrator.last_integration().label.as_deref(), Some("6"));
}

// ─── The running loop ───

/// Polls until the predicate holds or the timeout elapses.
async fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn forced_build_drives_a_full_cycle_through_the_loop() {
    let task = Arc::new(RecordingTask::succeeding("build"));
    let project = Project::new("loop")
        .with_tasks(vec![Arc::clone(&task) as _])
        // Keep the trigger out of the way; only the queue drives this test.
        .with_trigger(IntervalTrigger::new(Duration::from_secs(3600)));
    let handle = ProjectIntegrator::new(project).start();

    wait_until(Duration::from_secs(5), || {
        handle.snapshot().state == IntegratorState::Running
    })
    .await;

    assert!(handle.force_build(Some("alice".to_string()), Vec::new()));

    wait_until(Duration::from_secs(5), || {
        handle.snapshot().last_status == IntegrationStatus::Success
    })
    .await;
    assert_eq!(task.runs(), 1);
    assert_eq!(handle.snapshot().last_label.as_deref(), Some("1"));

    handle.stop();
    handle.wait_stopped().await;
    assert_eq!(handle.snapshot().state, IntegratorState::Stopped);
}

#[tokio::test]
async fn abort_interrupts_a_build_in_progress() {
    let (task, started) = BlockingTask::new("hang");
    let project = Project::new("abortable")
        .with_tasks(vec![Arc::new(task) as _])
        .with_trigger(IntervalTrigger::new(Duration::from_secs(3600)));
    let handle = ProjectIntegrator::new(project).start();

    assert!(handle.force_build(None, Vec::new()));
    wait_until(Duration::from_secs(5), || {
        handle.snapshot().activity == ProjectActivity::Building
    })
    .await;
    drop(started);

    handle.abort();

    wait_until(Duration::from_secs(5), || {
        handle.snapshot().last_status == IntegrationStatus::Failure
    })
    .await;

    // The integrator survives the abort and keeps serving cycles.
    wait_until(Duration::from_secs(5), || {
        handle.snapshot().activity == ProjectActivity::Sleeping
    })
    .await;

    handle.stop();
    handle.wait_stopped().await;
}

#[tokio::test(start_paused = true)]
async fn interval_trigger_drives_builds_through_the_loop() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let task = Arc::new(RecordingTask::succeeding("build"));
    let trigger = IntervalTrigger::new(Duration::from_secs(60))
        .with_clock(clock.clone())
        .with_condition(BuildCondition::ForceBuild);
    let project = Project::new("timed")
        .with_tasks(vec![Arc::clone(&task) as _])
        .with_trigger(trigger);
    let handle = ProjectIntegrator::new(project)
        .with_clock(clock.clone())
        .start();

    wait_until(Duration::from_secs(60), || {
        handle.snapshot().state == IntegratorState::Running
    })
    .await;

    // Nothing happens until the interval elapses on the project clock.
    assert_eq!(handle.snapshot().last_status, IntegrationStatus::Unknown);

    clock.advance(chrono::Duration::seconds(61));
    wait_until(Duration::from_secs(600), || {
        handle.snapshot().last_status == IntegrationStatus::Success
    })
    .await;
    assert!(task.runs() >= 1);

    handle.stop();
    handle.wait_stopped().await;
}

#[tokio::test]
async fn stop_before_any_build_leaves_a_clean_stopped_state() {
    let project =
        Project::new("idle").with_trigger(IntervalTrigger::new(Duration::from_secs(3600)));
    let handle = ProjectIntegrator::new(project).start();

    wait_until(Duration::from_secs(5), || {
        handle.snapshot().state == IntegratorState::Running
    })
    .await;

    handle.stop();
    handle.wait_stopped().await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, IntegratorState::Stopped);
    assert_eq!(snapshot.last_status, IntegrationStatus::Unknown);
}

#[tokio::test]
async fn pending_request_is_visible_in_the_snapshot() {
    let project =
        Project::new("pending").with_trigger(IntervalTrigger::new(Duration::from_secs(3600)));
    let integrator = ProjectIntegrator::new(project);
    let queue = integrator.queue();
    let status = integrator.status();

    // Not started: the queued request stays pending.
    assert!(queue.request_build(crate::types::BuildRequest::new(
        BuildCondition::IfModificationExists
    )));
    let snapshot = status.snapshot(queue.has_pending_request(), queue.len());
    assert!(snapshot.pending);
    assert_eq!(snapshot.activity, ProjectActivity::Pending);
    assert_eq!(snapshot.queue_length, 1);
}
