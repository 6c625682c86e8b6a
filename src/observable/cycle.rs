use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use tracing::error;

use super::AsyncTask;
use super::DistributedLock;
use crate::metrics::NOTIFY_CYCLE_METRIC;
use crate::metrics::NOTIFY_DURATION_METRIC;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleState {
    Started,
    Successful,
    Failed,
}

const STARTED: u8 = 0;
const SUCCESSFUL: u8 = 1;
const FAILED: u8 = 2;

/// One execution of the publish protocol.
///
/// Transitions out of STARTED exactly once; whichever terminal path wins
/// the compare-and-swap releases the distributed lock and resolves the
/// task, so the lock is released exactly once per cycle on every exit
/// path. A cycle that never acquired the lock (acquire timeout) must not
/// release it: the lock belongs to whichever cycle is still holding it.
pub(crate) struct NotificationCycle {
    topic: String,
    state: AtomicU8,
    lock: Arc<DistributedLock>,
    lock_held: AtomicBool,
    task: Arc<AsyncTask>,
    started_at: Instant,
}

impl NotificationCycle {
    pub(crate) fn new(topic: String, lock: Arc<DistributedLock>, task: Arc<AsyncTask>) -> Self {
        Self {
            topic,
            state: AtomicU8::new(STARTED),
            lock,
            lock_held: AtomicBool::new(false),
            task,
            started_at: Instant::now(),
        }
    }

    /// Records that this cycle owns the distributed lock. Terminal
    /// transitions release the lock only after this was called.
    pub(crate) fn lock_acquired(&self) {
        self.lock_held.store(true, Ordering::Release);
    }

    pub(crate) fn state(&self) -> CycleState {
        match self.state.load(Ordering::Acquire) {
            SUCCESSFUL => CycleState::Successful,
            FAILED => CycleState::Failed,
            _ => CycleState::Started,
        }
    }

    pub(crate) async fn success(&self) {
        if !self.transition(SUCCESSFUL) {
            return;
        }
        debug!("observers of {} were successfully notified", self.topic);
        self.release_if_held().await;
        self.observe(true);
        self.task.complete_successfully();
    }

    pub(crate) async fn failure(&self, err: Error) {
        if !self.transition(FAILED) {
            return;
        }
        error!("notify cycle for {} failed: {}", self.topic, err);
        self.release_if_held().await;
        self.observe(false);
        self.task.complete_exceptionally(err);
    }

    async fn release_if_held(&self) {
        if self.lock_held.swap(false, Ordering::AcqRel) {
            self.lock.release_lock().await;
        }
    }

    fn transition(&self, target: u8) -> bool {
        self.state
            .compare_exchange(STARTED, target, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn observe(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        NOTIFY_CYCLE_METRIC.with_label_values(&[&self.topic, outcome]).inc();
        NOTIFY_DURATION_METRIC
            .with_label_values(&[&self.topic])
            .observe(self.started_at.elapsed().as_millis() as f64);
    }
}
