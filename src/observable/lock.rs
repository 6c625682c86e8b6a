use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;
use tracing::error;

use crate::CoordinationClient;
use crate::NotificationError;
use crate::Result;

/// Bounded-wait wrapper over the coordination service's mutex primitive.
///
/// Every acquire is capped by the configured lock timeout; there is no
/// code path that can block on the mutex forever.
pub struct DistributedLock {
    client: Arc<dyn CoordinationClient>,
    path: String,
    lock_timeout: Duration,
    locked: AtomicBool,
}

impl DistributedLock {
    pub fn new(client: Arc<dyn CoordinationClient>, path: String, lock_timeout: Duration) -> Self {
        Self {
            client,
            path,
            lock_timeout,
            locked: AtomicBool::new(false),
        }
    }

    /// Acquires the mutex, waiting at most the configured lock timeout.
    ///
    /// # Errors
    /// - Returns [`NotificationError::LockTimeout`] if the mutex was not granted in time
    pub async fn acquire_lock(&self) -> Result<()> {
        match timeout(self.lock_timeout, self.client.acquire_mutex(&self.path)).await {
            Ok(result) => {
                result?;
                self.locked.store(true, Ordering::Release);
                debug!("acquired lock {}", self.path);
                Ok(())
            }
            Err(_) => Err(NotificationError::LockTimeout {
                path: self.path.clone(),
                timeout: self.lock_timeout,
            }
            .into()),
        }
    }

    /// Releases the mutex. Releasing an unheld lock is a no-op.
    pub async fn release_lock(&self) {
        if !self.locked.swap(false, Ordering::AcqRel) {
            debug!("release of {} without a held lock; ignoring", self.path);
            return;
        }
        if let Err(e) = self.client.release_mutex(&self.path).await {
            error!("failed to release lock {}: {}", self.path, e);
        } else {
            debug!("released lock {}", self.path);
        }
    }

    /// Observed lock state of this process
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Acquires, runs `action`, and releases even if `action` fails, then
    /// rethrows the original error.
    pub async fn locked_scope<F, Fut, R>(&self, action: F) -> Result<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.acquire_lock().await?;
        let result = action().await;
        self.release_lock().await;
        result
    }
}
