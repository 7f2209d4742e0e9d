//! Shared test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::clock::ManualClock;
use crate::publishers::{PublishError, Publisher};
use crate::sourcecontrol::{SourceControl, SourceControlError};
use crate::tasks::{Task, TaskError};
use crate::types::{IntegrationResult, IntegrationSummary, Modification, TaskResult};

/// A source control whose `get_modifications` responses are scripted, one
/// per call. Once the script is exhausted it reports no modifications.
pub struct ScriptedSourceControl {
    responses: Mutex<Vec<Result<Vec<Modification>, SourceControlError>>>,
    calls: AtomicUsize,
    advance: Option<(Arc<ManualClock>, chrono::Duration)>,
}

impl ScriptedSourceControl {
    pub fn returning(responses: Vec<Result<Vec<Modification>, SourceControlError>>) -> Self {
        ScriptedSourceControl {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
            advance: None,
        }
    }

    /// Advances a manual clock on every poll, standing in for the wall
    /// time a real poll-and-wait cycle would consume.
    pub fn advancing_clock(mut self, clock: Arc<ManualClock>, by: chrono::Duration) -> Self {
        self.advance = Some((clock, by));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceControl for ScriptedSourceControl {
    async fn get_modifications(
        &self,
        _from: &IntegrationSummary,
        _to: &IntegrationResult,
    ) -> Result<Vec<Modification>, SourceControlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((clock, by)) = &self.advance {
            clock.advance(*by);
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(Vec::new());
        }
        responses.remove(0)
    }

    async fn get_source(&self, _result: &IntegrationResult) -> Result<(), SourceControlError> {
        Ok(())
    }

    async fn label_source_control(
        &self,
        _result: &IntegrationResult,
    ) -> Result<(), SourceControlError> {
        Ok(())
    }
}

/// A task that records how often it ran and returns scripted outcomes.
pub struct RecordingTask {
    name: String,
    outcomes: Mutex<Vec<Result<bool, ()>>>,
    runs: AtomicUsize,
}

impl RecordingTask {
    /// Always succeeds.
    pub fn succeeding(name: &str) -> Self {
        Self::scripted(name, Vec::new())
    }

    /// Scripted outcomes, one per run: `Ok(success_flag)` or `Err(())`
    /// for a task error. Defaults to success once exhausted.
    pub fn scripted(name: &str, outcomes: Vec<Result<bool, ()>>) -> Self {
        RecordingTask {
            name: name.to_string(),
            outcomes: Mutex::new(outcomes),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Task for RecordingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        _result: &IntegrationResult,
        cancel: &CancellationToken,
    ) -> Result<TaskResult, TaskError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(TaskError::Aborted);
        }
        let outcome = {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Ok(true)
            } else {
                outcomes.remove(0)
            }
        };
        match outcome {
            Ok(true) => Ok(TaskResult::success(&self.name, "ok")),
            Ok(false) => Ok(TaskResult::failure(&self.name, "failed")),
            Err(()) => Err(TaskError::Io(std::io::Error::other("task blew up"))),
        }
    }
}

/// A task that blocks until aborted or released.
pub struct BlockingTask {
    name: String,
    started: Arc<tokio::sync::Notify>,
}

impl BlockingTask {
    pub fn new(name: &str) -> (Self, Arc<tokio::sync::Notify>) {
        let started = Arc::new(tokio::sync::Notify::new());
        (
            BlockingTask {
                name: name.to_string(),
                started: Arc::clone(&started),
            },
            started,
        )
    }
}

#[async_trait]
impl Task for BlockingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        _result: &IntegrationResult,
        cancel: &CancellationToken,
    ) -> Result<TaskResult, TaskError> {
        self.started.notify_waiters();
        cancel.cancelled().await;
        Err(TaskError::Aborted)
    }
}

/// A publisher that counts publishes and can be told to fail.
pub struct CountingPublisher {
    publishes: AtomicUsize,
    fail: bool,
}

impl CountingPublisher {
    pub fn new() -> Self {
        CountingPublisher {
            publishes: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        CountingPublisher {
            publishes: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for CountingPublisher {
    fn name(&self) -> &str {
        "counting"
    }

    async fn publish(&self, _result: &IntegrationResult) -> Result<(), PublishError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PublishError::Failed("configured to fail".to_string()));
        }
        Ok(())
    }
}
