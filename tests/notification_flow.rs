//! End-to-end notification flow over a shared coordination service.
//!
//! Two factories stand in for two processes: each owns its own session
//! and observable handle, while all cross-instance state lives in the
//! shared [`MemoryCoordination`] subtree.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use o_engine::utils::hostname::StaticHostnameProvider;
use o_engine::MemoryCoordination;
use o_engine::Observable;
use o_engine::ObservableFactory;
use o_engine::Observer;
use o_engine::Settings;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct News {
    title: String,
    content: String,
}

#[derive(Default)]
struct NewsDesk {
    received: Mutex<Vec<Option<News>>>,
}

#[async_trait]
impl Observer<News> for NewsDesk {
    async fn update(&self, payload: Option<News>) {
        self.received.lock().push(payload);
    }
}

fn flow_settings() -> Settings {
    let mut settings = Settings::default();
    settings.coordination.namespace_suffix = "it".to_string();
    settings.notification.lock_timeout_in_ms = 500;
    settings.notification.notification_timeout_in_ms = 2000;
    settings
}

async fn instance(client: Arc<MemoryCoordination>, host: &str) -> Observable<News> {
    let factory = ObservableFactory::connect_with_hostname(
        client,
        flow_settings(),
        &StaticHostnameProvider(host.to_string()),
    )
    .await
    .expect("session should establish");
    factory.create::<News>("news").await.expect("topic should initialize")
}

#[tokio::test]
async fn test_publish_reaches_observers_on_another_instance() {
    let client = MemoryCoordination::new();
    let publisher = instance(client.clone(), "host-a").await;
    let subscriber = instance(client.clone(), "host-b").await;

    let desk = Arc::new(NewsDesk::default());
    subscriber
        .register_observer(desk.clone() as Arc<dyn Observer<News>>)
        .await;

    let payload = Some(News {
        title: "A".to_string(),
        content: "B".to_string(),
    });
    publisher
        .notify_observers(payload.clone())
        .await
        .expect("the remote receipt should arrive in time");

    assert_eq!(desk.received.lock().clone(), vec![payload]);
}

#[tokio::test]
async fn test_observers_on_both_instances_share_one_cycle() {
    let client = MemoryCoordination::new();
    let left = instance(client.clone(), "host-a").await;
    let right = instance(client.clone(), "host-b").await;

    let left_desk = Arc::new(NewsDesk::default());
    let right_desk = Arc::new(NewsDesk::default());
    left.register_observer(left_desk.clone() as Arc<dyn Observer<News>>)
        .await;
    right
        .register_observer(right_desk.clone() as Arc<dyn Observer<News>>)
        .await;

    let payload = Some(News {
        title: "shared".to_string(),
        content: "cycle".to_string(),
    });
    left.notify_observers(payload.clone()).await.unwrap();

    assert_eq!(left_desk.received.lock().clone(), vec![payload.clone()]);
    assert_eq!(right_desk.received.lock().clone(), vec![payload]);
}

#[tokio::test]
async fn test_shutdown_removes_an_instance_from_the_quorum() {
    let client = MemoryCoordination::new();
    let publisher = instance(client.clone(), "host-a").await;
    let leaving = instance(client.clone(), "host-b").await;

    let desk = Arc::new(NewsDesk::default());
    leaving
        .register_observer(desk.clone() as Arc<dyn Observer<News>>)
        .await;

    // host-b shuts down cleanly; its markers must not stall host-a
    leaving.unregister_all_observers().await;

    publisher
        .notify_observers(Some(News {
            title: "after".to_string(),
            content: "shutdown".to_string(),
        }))
        .await
        .expect("no stale marker should remain");
    assert!(desk.received.lock().is_empty());
}

#[tokio::test]
async fn test_async_publish_resolves_through_callbacks() {
    let client = MemoryCoordination::new();
    let publisher = instance(client.clone(), "host-a").await;
    let subscriber = instance(client.clone(), "host-b").await;

    let desk = Arc::new(NewsDesk::default());
    subscriber
        .register_observer(desk.clone() as Arc<dyn Observer<News>>)
        .await;

    let delivered = Arc::new(Mutex::new(false));
    let task = publisher
        .notify_observers_async(Some(News {
            title: "async".to_string(),
            content: "flow".to_string(),
        }))
        .await;
    let flag = delivered.clone();
    task.when_complete(move || {
        *flag.lock() = true;
    });

    task.join(Duration::from_secs(2)).await.expect("cycle should succeed");
    assert!(*delivered.lock());
    assert_eq!(desk.received.lock().len(), 1);
}
