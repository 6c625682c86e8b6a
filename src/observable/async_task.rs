use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::error;

use crate::Error;
use crate::NotificationError;
use crate::Result;

type CompleteFn = Box<dyn FnOnce() + Send + 'static>;
type ErrorFn = Box<dyn FnOnce(&Error) + Send + 'static>;

#[derive(Debug, Clone)]
enum TaskOutcome {
    Success,
    Failure(Arc<Error>),
}

#[derive(Default)]
struct TaskInner {
    complete_task: Option<CompleteFn>,
    error_task: Option<ErrorFn>,
    completion_task: Option<CompleteFn>,
    outcome: Option<TaskOutcome>,
}

/// One-shot outcome object for a single publish.
///
/// Tracks SUCCESS/FAILURE exactly once and dispatches the attached
/// callbacks. Callbacks may be attached before or after the outcome is
/// known; a late attachment fires synchronously inside the attach call.
/// Only the first of [`complete_successfully`](AsyncTask::complete_successfully) /
/// [`complete_exceptionally`](AsyncTask::complete_exceptionally) has
/// effect, from either thread, in either order.
pub struct AsyncTask {
    inner: Mutex<TaskInner>,
    one_off_toggle: AtomicBool,
    resolved_tx: watch::Sender<bool>,
}

impl Default for AsyncTask {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncTask {
    pub fn new() -> Self {
        let (resolved_tx, _) = watch::channel(false);
        Self {
            inner: Mutex::new(TaskInner::default()),
            one_off_toggle: AtomicBool::new(false),
            resolved_tx,
        }
    }

    /// Blocks the caller until resolution or `timeout_duration`.
    ///
    /// # Errors
    /// - Returns [`NotificationError::JoinTimeout`] if neither outcome resolved in time
    /// - Returns [`NotificationError::CycleFailed`] re-raising the captured error on the
    ///   failure path
    pub async fn join(&self, timeout_duration: Duration) -> Result<()> {
        let mut rx = self.resolved_tx.subscribe();
        if timeout(timeout_duration, rx.wait_for(|resolved| *resolved))
            .await
            .is_err()
        {
            return Err(NotificationError::JoinTimeout(timeout_duration).into());
        }

        match self.inner.lock().outcome.clone() {
            Some(TaskOutcome::Failure(err)) => Err(NotificationError::CycleFailed(err.to_string()).into()),
            _ => Ok(()),
        }
    }

    /// Attach the success callback. Fires synchronously if the task has
    /// already completed successfully.
    pub fn when_complete(&self, complete_task: impl FnOnce() + Send + 'static) -> &Self {
        let mut inner = self.inner.lock();
        match inner.outcome {
            Some(TaskOutcome::Success) => {
                drop(inner);
                guarded(complete_task);
            }
            _ => inner.complete_task = Some(Box::new(complete_task)),
        }
        self
    }

    /// Attach the error callback. Fires synchronously if the task has
    /// already failed.
    pub fn when_error(&self, error_task: impl FnOnce(&Error) + Send + 'static) -> &Self {
        let mut inner = self.inner.lock();
        match &inner.outcome {
            Some(TaskOutcome::Failure(err)) => {
                let err = err.clone();
                drop(inner);
                guarded(move || error_task(&err));
            }
            _ => inner.error_task = Some(Box::new(error_task)),
        }
        self
    }

    /// Attach a callback that fires on either outcome, after the
    /// outcome-specific one. Fires synchronously if already resolved.
    pub fn when_completion(&self, completion_task: impl FnOnce() + Send + 'static) -> &Self {
        let mut inner = self.inner.lock();
        if inner.outcome.is_some() {
            drop(inner);
            guarded(completion_task);
        } else {
            inner.completion_task = Some(Box::new(completion_task));
        }
        self
    }

    pub(crate) fn complete_successfully(&self) {
        if !self.should_resolve() {
            return;
        }
        let (complete_task, completion_task) = {
            let mut inner = self.inner.lock();
            inner.outcome = Some(TaskOutcome::Success);
            (inner.complete_task.take(), inner.completion_task.take())
        };
        if let Some(task) = complete_task {
            guarded(task);
        }
        if let Some(task) = completion_task {
            guarded(task);
        }
        // send_replace stores the value even with no live subscriber, so a
        // join that starts after resolution still observes it
        self.resolved_tx.send_replace(true);
    }

    pub(crate) fn complete_exceptionally(&self, err: Error) {
        if !self.should_resolve() {
            return;
        }
        let err = Arc::new(err);
        let (error_task, completion_task) = {
            let mut inner = self.inner.lock();
            inner.outcome = Some(TaskOutcome::Failure(err.clone()));
            (inner.error_task.take(), inner.completion_task.take())
        };
        if let Some(task) = error_task {
            guarded(move || task(&err));
        }
        if let Some(task) = completion_task {
            guarded(task);
        }
        self.resolved_tx.send_replace(true);
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.lock().outcome.is_some()
    }

    pub fn has_completed_successfully(&self) -> bool {
        matches!(self.inner.lock().outcome, Some(TaskOutcome::Success))
    }

    /// The captured error, if the task failed.
    pub fn error(&self) -> Option<Arc<Error>> {
        match &self.inner.lock().outcome {
            Some(TaskOutcome::Failure(err)) => Some(err.clone()),
            _ => None,
        }
    }

    fn should_resolve(&self) -> bool {
        self.one_off_toggle
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// User callbacks must never take a cycle down with them
fn guarded<F: FnOnce()>(task: F) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        error!("user callback panicked; the panic was swallowed");
    }
}
