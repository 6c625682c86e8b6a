use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::Observer;
use crate::metrics::WATCH_DELIVERY_METRIC;
use crate::utils::codec;
use crate::CoordinationClient;
use crate::NotificationError;
use crate::Result;
use crate::WatchEvent;
use crate::WatchKind;

/// Per-observer adapter between coordination-service watch events and one
/// local [`Observer`].
///
/// Owns the observer's marker node. While ENABLED, a background loop turns
/// each one-shot watch firing on the topic data node into exactly one
/// local delivery, re-arms the watch, and then touches the marker node as
/// the receipt signal the publisher counts. DISABLED is terminal: the
/// marker node is deleted first, then the flag flips, so an event already
/// in flight observes the flag and becomes a no-op instead of delivering
/// or re-arming.
pub(crate) struct ObserverWatcher {
    client: Arc<dyn CoordinationClient>,
    marker_path: String,
    enabled: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl ObserverWatcher {
    /// Creates the marker node if missing, arms the first watch on the
    /// topic data node, and spawns the delivery loop.
    pub(crate) async fn spawn<T>(
        client: Arc<dyn CoordinationClient>,
        topic_path: String,
        marker_path: String,
        observer: Arc<dyn Observer<T>>,
    ) -> Result<Self>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        if !client.exists(&marker_path).await? {
            client.create(&marker_path, Vec::new(), false).await?;
        }

        let enabled = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        // Arm before returning so a write racing the registration cannot
        // slip past the first firing
        let watch_rx = client.add_watch(&topic_path).await?;

        tokio::spawn(watch_loop(
            client.clone(),
            topic_path,
            marker_path.clone(),
            observer,
            enabled.clone(),
            cancel.clone(),
            watch_rx,
        ));

        Ok(Self {
            client,
            marker_path,
            enabled,
            cancel,
        })
    }

    /// Permanently disables this watcher.
    ///
    /// The marker node is deleted before the flag flips: once the marker
    /// is gone no publisher will enumerate this observer, and the flag
    /// stops any firing that was already in flight.
    pub(crate) async fn disable(&self) -> Result<()> {
        self.client.delete(&self.marker_path).await?;
        self.enabled.store(false, Ordering::Release);
        self.cancel.cancel();
        Ok(())
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn marker_path(&self) -> &str {
        &self.marker_path
    }
}

async fn watch_loop<T>(
    client: Arc<dyn CoordinationClient>,
    topic_path: String,
    marker_path: String,
    observer: Arc<dyn Observer<T>>,
    enabled: Arc<AtomicBool>,
    cancel: CancellationToken,
    mut watch_rx: oneshot::Receiver<WatchEvent>,
) where
    T: DeserializeOwned + Send + Sync + 'static,
{
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = &mut watch_rx => match event {
                Ok(event) => event,
                Err(_) => {
                    warn!("watch channel for {} closed; stopping watcher", topic_path);
                    break;
                }
            },
        };

        if !enabled.load(Ordering::Acquire) {
            debug!("watcher is disabled; no action will be performed");
            break;
        }
        if event.kind == WatchKind::Deleted {
            warn!("topic node {} was deleted; stopping watcher", topic_path);
            break;
        }
        debug!("data change detected on {}", topic_path);

        // 1. collect data and deliver it to the observer
        let delivered = deliver(&client, &topic_path, &observer).await;

        // 2. re-arm: the watch primitive fires once per registration
        watch_rx = match client.add_watch(&topic_path).await {
            Ok(rx) => rx,
            Err(e) => {
                error!("could not re-arm watch on {}: {}", topic_path, e);
                break;
            }
        };

        // 3. touch the marker node: the receipt signal the publisher's
        // armed watch is waiting for. Skipped when nothing was delivered,
        // so a decode failure shows up as a missing receipt rather than a
        // false one.
        if delivered {
            if let Err(e) = client.set_data(&marker_path, Vec::new()).await {
                error!("could not signal receipt on {}: {}", marker_path, e);
            }
        }
    }
}

/// Read and decode the topic payload and invoke the observer.
///
/// Returns whether the observer actually received the payload. A decode
/// failure is logged and leaves the observer participating in future
/// cycles; the current cycle simply never sees this receipt.
async fn deliver<T>(client: &Arc<dyn CoordinationClient>, topic_path: &str, observer: &Arc<dyn Observer<T>>) -> bool
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let versioned = match client.get_data(topic_path).await {
        Ok(versioned) => versioned,
        Err(e) => {
            error!("could not read topic data {}: {}", topic_path, e);
            WATCH_DELIVERY_METRIC
                .with_label_values(&[topic_path, "read_error"])
                .inc();
            return false;
        }
    };

    match codec::decode::<T>(&versioned.data) {
        Ok(payload) => {
            if AssertUnwindSafe(observer.update(payload)).catch_unwind().await.is_err() {
                error!("observer panicked during update; the panic was swallowed");
            }
            WATCH_DELIVERY_METRIC
                .with_label_values(&[topic_path, "delivered"])
                .inc();
            true
        }
        Err(e) => {
            let err = NotificationError::Decode {
                topic: topic_path.to_string(),
                source: e,
            };
            error!("{}", err);
            WATCH_DELIVERY_METRIC
                .with_label_values(&[topic_path, "decode_error"])
                .inc();
            false
        }
    }
}
