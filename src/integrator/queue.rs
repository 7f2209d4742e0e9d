//! Single-slot, priority-collapsing mailbox for build requests.
//!
//! An arbitrary burst of concurrent build requests for one project
//! collapses into at most one pending request, keyed on `BuildCondition`
//! priority: a stronger condition replaces a weaker pending one, and a
//! weaker-or-equal arrival is a no-op (it is already represented by what
//! is pending). Exactly one consumer - the project's integrator - waits
//! on the slot.
//!
//! This is a pure synchronization primitive: it cannot fail, only block.
//! Every `request_build` call either fills the slot or is a provable
//! no-op, so waiters cannot starve.

use std::sync::Mutex;

use tokio::sync::Notify;

use crate::types::{BuildCondition, BuildRequest};

/// A per-project build-request mailbox holding at most one request.
#[derive(Debug, Default)]
pub struct BuildRequestQueue {
    slot: Mutex<Option<BuildRequest>>,
    notify: Notify,
}

impl BuildRequestQueue {
    pub fn new() -> Self {
        BuildRequestQueue {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Offers a request to the queue.
    ///
    /// The request is accepted if the slot is empty or the new condition
    /// has strictly higher priority than the pending one. `NoBuild`
    /// requests are never accepted. Returns whether the request was
    /// accepted. Safe under arbitrary concurrent callers.
    pub fn request_build(&self, request: BuildRequest) -> bool {
        if request.condition == BuildCondition::NoBuild {
            return false;
        }

        let accepted = {
            let mut slot = self.slot.lock().unwrap();
            let replaces = match slot.as_ref() {
                Some(pending) => pending.condition < request.condition,
                None => true,
            };
            if replaces {
                *slot = Some(request);
            }
            replaces
        };

        if accepted {
            self.notify.notify_one();
        }
        accepted
    }

    /// Non-blocking peek: is anything pending?
    pub fn has_pending_request(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Non-blocking peek at the pending condition.
    pub fn pending_condition(&self) -> Option<BuildCondition> {
        self.slot.lock().unwrap().as_ref().map(|r| r.condition)
    }

    /// Number of pending requests (zero or one, by construction).
    pub fn len(&self) -> usize {
        usize::from(self.has_pending_request())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_pending_request()
    }

    /// Atomically consumes the pending request, if any, without blocking.
    pub fn take_pending(&self) -> Option<BuildRequest> {
        self.slot.lock().unwrap().take()
    }

    /// Clears the pending request. Returns whether one was cancelled.
    pub fn cancel_pending(&self) -> bool {
        self.slot.lock().unwrap().take().is_some()
    }

    /// Waits until a request is pending, then atomically consumes it.
    ///
    /// Never returns a `NoBuild` request: `request_build` refuses them at
    /// the door. Cancel-safe: dropping the future leaves the slot intact.
    pub async fn wait_for_request(&self) -> BuildRequest {
        loop {
            // Register interest before checking the slot so a concurrent
            // request_build between the check and the await cannot be lost.
            let notified = self.notify.notified();

            if let Some(request) = self.take_pending() {
                debug_assert_ne!(request.condition, BuildCondition::NoBuild);
                return request;
            }

            notified.await;
        }
    }
}
