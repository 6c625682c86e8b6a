use std::time::Duration;

use tokio::time::timeout;

use super::*;
use crate::CoordinationError;
use crate::Error;

#[tokio::test]
async fn test_create_and_read_back() {
    let client = MemoryCoordination::new();

    client
        .create("/app/topic", b"v1".to_vec(), true)
        .await
        .expect("create with parents should succeed");

    let versioned = client.get_data("/app/topic").await.expect("node should exist");
    assert_eq!(versioned.data, b"v1".to_vec());
    assert_eq!(versioned.version, 0);
    assert!(client.exists("/app").await.unwrap());
}

#[tokio::test]
async fn test_create_without_parents_fails() {
    let client = MemoryCoordination::new();

    let err = client
        .create("/missing/child", Vec::new(), false)
        .await
        .expect_err("parent is missing");
    assert!(matches!(
        err,
        Error::Coordination(CoordinationError::NodeNotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_create_fails() {
    let client = MemoryCoordination::new();
    client.create("/a", Vec::new(), false).await.unwrap();

    let err = client.create("/a", Vec::new(), false).await.expect_err("duplicate");
    assert!(matches!(err, Error::Coordination(CoordinationError::NodeExists(_))));
}

#[tokio::test]
async fn test_set_data_bumps_version() {
    let client = MemoryCoordination::new();
    client.create("/a", Vec::new(), false).await.unwrap();

    assert_eq!(client.set_data("/a", b"x".to_vec()).await.unwrap(), 1);
    assert_eq!(client.set_data("/a", b"y".to_vec()).await.unwrap(), 2);
    assert_eq!(client.get_data("/a").await.unwrap().version, 2);
}

#[tokio::test]
async fn test_versioned_write_detects_conflict() {
    let client = MemoryCoordination::new();
    client.create("/a", Vec::new(), false).await.unwrap();
    client.set_data("/a", b"x".to_vec()).await.unwrap();

    let err = client
        .set_data_versioned("/a", b"stale".to_vec(), 0)
        .await
        .expect_err("version 0 is stale");
    assert!(matches!(
        err,
        Error::Coordination(CoordinationError::VersionConflict { .. })
    ));

    assert_eq!(client.set_data_versioned("/a", b"fresh".to_vec(), 1).await.unwrap(), 2);
}

#[tokio::test]
async fn test_get_children_returns_names_only() {
    let client = MemoryCoordination::new();
    client.create("/t/observers/host0", Vec::new(), true).await.unwrap();
    client.create("/t/observers/host1", Vec::new(), true).await.unwrap();
    client.create("/t/lock", Vec::new(), true).await.unwrap();

    let children = client.get_children("/t/observers").await.unwrap();
    assert_eq!(children, vec!["host0".to_string(), "host1".to_string()]);

    let top = client.get_children("/t").await.unwrap();
    assert_eq!(top, vec!["lock".to_string(), "observers".to_string()]);
}

#[tokio::test]
async fn test_watch_fires_once_per_registration() {
    let client = MemoryCoordination::new();
    client.create("/a", Vec::new(), false).await.unwrap();

    let rx = client.add_watch("/a").await.unwrap();
    client.set_data("/a", b"one".to_vec()).await.unwrap();

    let event = rx.await.expect("watch should fire");
    assert_eq!(event.kind, WatchKind::DataChanged);
    assert_eq!(event.path, "/a");

    // A second write without re-arming delivers nothing: the next watch
    // only sees the change after it was armed
    let rx = client.add_watch("/a").await.unwrap();
    client.set_data("/a", b"two".to_vec()).await.unwrap();
    let event = rx.await.expect("re-armed watch should fire");
    assert_eq!(event.kind, WatchKind::DataChanged);
}

#[tokio::test]
async fn test_delete_fires_deleted_watch() {
    let client = MemoryCoordination::new();
    client.create("/a", Vec::new(), false).await.unwrap();

    let rx = client.add_watch("/a").await.unwrap();
    client.delete("/a").await.unwrap();

    let event = rx.await.expect("watch should fire on delete");
    assert_eq!(event.kind, WatchKind::Deleted);
    assert!(!client.exists("/a").await.unwrap());
}

#[tokio::test]
async fn test_delete_with_children_fails() {
    let client = MemoryCoordination::new();
    client.create("/a/b", Vec::new(), true).await.unwrap();

    let err = client.delete("/a").await.expect_err("node has children");
    assert!(matches!(err, Error::Coordination(CoordinationError::NotEmpty(_))));
}

#[tokio::test]
async fn test_mutex_blocks_second_acquirer_until_release() {
    let client = MemoryCoordination::new();

    client.acquire_mutex("/t/lock").await.unwrap();

    // Second acquire on the held mutex must not complete
    let blocked = timeout(Duration::from_millis(50), client.acquire_mutex("/t/lock")).await;
    assert!(blocked.is_err(), "second acquire should block while held");

    client.release_mutex("/t/lock").await.unwrap();
    timeout(Duration::from_millis(50), client.acquire_mutex("/t/lock"))
        .await
        .expect("acquire should succeed after release")
        .unwrap();
}

#[tokio::test]
async fn test_release_without_hold_is_noop() {
    let client = MemoryCoordination::new();
    assert!(client.release_mutex("/t/lock").await.is_ok());
}

#[test]
fn test_path_helpers() {
    assert_eq!(parent_path("/a/b/c"), Some("/a/b"));
    assert_eq!(parent_path("/a"), Some("/"));
    assert_eq!(parent_path("/"), None);
    assert_eq!(node_name("/a/b/c"), "c");
}
