use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::AsyncTask;
use super::DistributedLock;
use super::NotificationCycle;
use super::Observer;
use super::ObserverWatcher;
use crate::constants::LOCK_NODE;
use crate::constants::OBSERVERS_NODE;
use crate::metrics::REGISTERED_OBSERVERS_METRIC;
use crate::utils::backoff::task_with_timeout_and_exponential_backoff;
use crate::utils::codec;
use crate::BackoffPolicy;
use crate::CoordinationClient;
use crate::CoordinationError;
use crate::NotificationConfig;
use crate::NotificationError;
use crate::Result;

struct RegisteredObserver<T: ?Sized> {
    observer: Arc<T>,
    watcher: ObserverWatcher,
}

/// Topic-scoped distributed observable.
///
/// Owns the in-memory observer registry for this process and orchestrates
/// the publish protocol: lock, arm marker watches, write the payload,
/// await the receipt quorum, resolve the cycle. Cross-process state lives
/// entirely in the coordination subtree at `path`:
///
/// ```text
/// <path>                # latest payload + version
/// <path>/lock           # distributed mutex
/// <path>/observers/<m>  # one marker node per registered observer
/// ```
pub struct Observable<T> {
    client: Arc<dyn CoordinationClient>,
    notification: NotificationConfig,
    cleanup: BackoffPolicy,
    hostname: String,
    topic: String,
    path: String,
    observers_path: String,
    lock: Arc<DistributedLock>,
    observers: DashMap<usize, RegisteredObserver<dyn Observer<T>>>,
    /// Process-local marker sequence. Together with the hostname this is
    /// not guaranteed unique across process restarts or multiple processes
    /// per host; a stale marker from a dead process will stall cycles
    /// until it is cleaned up.
    marker_seq: AtomicUsize,
}

impl<T> Observable<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) async fn new(
        client: Arc<dyn CoordinationClient>,
        notification: NotificationConfig,
        cleanup: BackoffPolicy,
        hostname: String,
        topic: String,
        path: String,
    ) -> Result<Self> {
        let observers_path = format!("{}/{}", path, OBSERVERS_NODE);
        let lock = Arc::new(DistributedLock::new(
            client.clone(),
            format!("{}/{}", path, LOCK_NODE),
            notification.lock_timeout(),
        ));

        // Topic layout is created lazily by whichever process gets here
        // first; concurrent creators race benignly on NodeExists
        if !client.exists(&path).await? {
            if let Err(e) = client.create(&path, codec::encode(&None::<T>)?, true).await {
                warn!("could not create topic node {}: {}", path, e);
            }
        }
        if !client.exists(&observers_path).await? {
            if let Err(e) = client.create(&observers_path, Vec::new(), false).await {
                warn!("could not create observers path {}: {}", observers_path, e);
            }
        }

        Ok(Self {
            client,
            notification,
            cleanup,
            hostname,
            topic,
            path,
            observers_path,
            lock,
            observers: DashMap::new(),
            marker_seq: AtomicUsize::new(0),
        })
    }

    /// Registers a local observer under the topic's distributed lock.
    ///
    /// Creates the observer's marker node and starts its watcher. A
    /// duplicate registration of the same observer instance replaces its
    /// prior watcher. Failures are logged and non-fatal: the caller is
    /// never blocked beyond the lock timeout, and can verify the outcome
    /// through [`is_registered`](Observable::is_registered).
    pub async fn register_observer(&self, observer: Arc<dyn Observer<T>>) {
        let result = self
            .lock
            .locked_scope(|| async {
                let marker_path = self.next_marker_path();
                let watcher = ObserverWatcher::spawn(
                    self.client.clone(),
                    self.path.clone(),
                    marker_path,
                    observer.clone(),
                )
                .await?;

                let key = observer_key(&observer);
                if let Some(prev) = self.observers.insert(
                    key,
                    RegisteredObserver {
                        observer: observer.clone(),
                        watcher,
                    },
                ) {
                    debug!("observer re-registered; replacing its previous watcher");
                    if let Err(e) = prev.watcher.disable().await {
                        warn!("could not disable replaced watcher: {}", e);
                    }
                }
                debug!("observer registered on {}", self.topic);
                Ok(())
            })
            .await;

        if let Err(e) = result {
            error!("exception while registering observer on {}: {}", self.topic, e);
        }
        self.observe_registry_size();
    }

    /// Unregisters a local observer under the topic's distributed lock.
    ///
    /// Deletes its marker node and disables its watcher. An unknown
    /// observer is logged and ignored.
    pub async fn unregister_observer(&self, observer: &Arc<dyn Observer<T>>) {
        let key = observer_key(observer);
        let result = self.lock.locked_scope(|| self.unregistering(key)).await;
        if let Err(e) = result {
            error!("exception while unregistering observer on {}: {}", self.topic, e);
        }
        self.observe_registry_size();
    }

    /// Unregisters every currently-known observer under one lock scope.
    ///
    /// Hosting processes should call this on shutdown so observers do not
    /// appear falsely registered after the process exits.
    pub async fn unregister_all_observers(&self) {
        if self.observers.is_empty() {
            return;
        }
        let result = self
            .lock
            .locked_scope(|| async {
                let keys: Vec<usize> = self.observers.iter().map(|entry| *entry.key()).collect();
                for key in keys {
                    self.unregistering(key).await?;
                }
                Ok(())
            })
            .await;
        if let Err(e) = result {
            error!("exception while unregistering all observers on {}: {}", self.topic, e);
        }
        self.observe_registry_size();
    }

    async fn unregistering(&self, key: usize) -> Result<()> {
        match self.observers.remove(&key) {
            Some((_, registered)) => {
                // Best-effort marker cleanup; a transient delete failure
                // must not leave the watcher half-disabled
                if let Err(e) =
                    task_with_timeout_and_exponential_backoff(|| registered.watcher.disable(), self.cleanup).await
                {
                    error!(
                        "could not delete marker {}: {}",
                        registered.watcher.marker_path(),
                        e
                    );
                } else {
                    debug!("observer unregistered from {}", self.topic);
                }
            }
            None => {
                warn!("the observer was not found within the list of registered observers");
            }
        }
        Ok(())
    }

    /// Whether this exact observer instance is currently registered.
    pub fn is_registered(&self, observer: &Arc<dyn Observer<T>>) -> bool {
        self.observers.contains_key(&observer_key(observer))
    }

    /// The currently-registered observers of this process.
    pub fn observers(&self) -> Vec<Arc<dyn Observer<T>>> {
        self.observers.iter().map(|entry| entry.observer.clone()).collect()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Publishes `payload` and blocks until every currently-registered
    /// observer signalled receipt, or the notification timeout elapsed.
    ///
    /// # Errors
    /// - Returns [`NotificationError::CycleFailed`] if the cycle failed (lock timeout,
    ///   quorum timeout, coordination failure)
    /// - Returns [`NotificationError::JoinTimeout`] if the cycle did not resolve in time
    pub async fn notify_observers(&self, payload: Option<T>) -> Result<()> {
        let task = self.notify_observers_async(payload).await;
        task.join(self.notification.notification_timeout()).await
    }

    /// Publishes `payload` and returns immediately with the cycle's
    /// [`AsyncTask`]; outcome and callbacks resolve later.
    ///
    /// The returned task is resolved exactly once: success once all
    /// receipt signals arrived, failure on lock timeout, coordination
    /// errors, or quorum timeout. The distributed lock is released on
    /// every exit path before callbacks run.
    pub async fn notify_observers_async(&self, payload: Option<T>) -> Arc<AsyncTask> {
        let task = Arc::new(AsyncTask::new());
        let cycle = Arc::new(NotificationCycle::new(
            self.topic.clone(),
            self.lock.clone(),
            task.clone(),
        ));

        // Mutual exclusion must hold for the whole armed-watches window;
        // an unacquired lock fails the cycle instead of proceeding
        if let Err(e) = self.lock.acquire_lock().await {
            cycle.failure(e).await;
            return task;
        }
        cycle.lock_acquired();

        if let Err(e) = self.run_publish(&cycle, payload).await {
            cycle.failure(e).await;
        }
        task
    }

    async fn run_publish(&self, cycle: &Arc<NotificationCycle>, payload: Option<T>) -> Result<()> {
        // Enumerate current marker nodes: this count is the quorum target
        // for this cycle
        let markers = self.client.get_children(&self.observers_path).await?;
        debug!("observers of {}: {:?}", self.topic, markers);

        // Arm a one-shot watch on every marker BEFORE the data write: a
        // fast observer could otherwise re-mutate its marker before the
        // publisher starts counting
        let mut receipts = Vec::with_capacity(markers.len());
        for marker in &markers {
            let marker_path = format!("{}/{}", self.observers_path, marker);
            let rx = self.client.add_watch(&marker_path).await?;
            receipts.push((marker_path, rx));
        }

        let expected = markers.len();
        let notification_timeout = self.notification.notification_timeout();
        let countdown_cycle = cycle.clone();
        tokio::spawn(async move {
            await_quorum(countdown_cycle, receipts, expected, notification_timeout).await;
        });

        // Publish: a single write to the topic data node fans out through
        // the observers' armed watches
        let bytes = codec::encode(&payload)?;
        self.client.set_data(&self.path, bytes).await?;
        Ok(())
    }

    fn next_marker_path(&self) -> String {
        format!(
            "{}/{}{}",
            self.observers_path,
            self.hostname,
            self.marker_seq.fetch_add(1, Ordering::Relaxed)
        )
    }

    fn observe_registry_size(&self) {
        REGISTERED_OBSERVERS_METRIC
            .with_label_values(&[&self.topic])
            .set(self.observers.len() as f64);
    }
}

/// Counts receipt signals until the quorum target is met or the
/// notification timeout elapses, then resolves the cycle.
async fn await_quorum(
    cycle: Arc<NotificationCycle>,
    receipts: Vec<(String, tokio::sync::oneshot::Receiver<crate::WatchEvent>)>,
    expected: usize,
    notification_timeout: Duration,
) {
    let mut pending: FuturesUnordered<_> = receipts
        .into_iter()
        .map(|(marker_path, rx)| async move { rx.await.map_err(|_| marker_path) })
        .collect();
    let deadline = tokio::time::sleep(notification_timeout);
    tokio::pin!(deadline);

    let mut received = 0;
    while received < expected {
        tokio::select! {
            _ = &mut deadline => {
                cycle
                    .failure(
                        NotificationError::QuorumTimeout {
                            expected,
                            received,
                            timeout: notification_timeout,
                        }
                        .into(),
                    )
                    .await;
                return;
            }
            signal = pending.next() => match signal {
                Some(Ok(_)) => received += 1,
                Some(Err(marker_path)) => {
                    // Marker vanished mid-cycle; its receipt can never
                    // arrive, so only the deadline can end this cycle
                    warn!("{}", CoordinationError::WatchLost(marker_path));
                }
                None => {
                    deadline.as_mut().await;
                    cycle
                        .failure(
                            NotificationError::QuorumTimeout {
                                expected,
                                received,
                                timeout: notification_timeout,
                            }
                            .into(),
                        )
                        .await;
                    return;
                }
            },
        }
    }
    cycle.success().await;
}

fn observer_key<T>(observer: &Arc<dyn Observer<T>>) -> usize {
    Arc::as_ptr(observer) as *const () as usize
}
