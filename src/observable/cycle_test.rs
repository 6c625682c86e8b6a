use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::AsyncTask;
use super::CycleState;
use super::DistributedLock;
use super::NotificationCycle;
use crate::CoordinationError;
use crate::MemoryCoordination;

async fn locked_cycle() -> (Arc<DistributedLock>, Arc<AsyncTask>, NotificationCycle) {
    let lock = Arc::new(DistributedLock::new(
        MemoryCoordination::new(),
        "/news/lock".to_string(),
        Duration::from_millis(100),
    ));
    lock.acquire_lock().await.unwrap();
    let task = Arc::new(AsyncTask::new());
    let cycle = NotificationCycle::new("news".to_string(), lock.clone(), task.clone());
    cycle.lock_acquired();
    (lock, task, cycle)
}

#[tokio::test]
async fn test_success_releases_lock_and_resolves_task() {
    let (lock, task, cycle) = locked_cycle().await;
    assert_eq!(cycle.state(), CycleState::Started);

    cycle.success().await;

    assert_eq!(cycle.state(), CycleState::Successful);
    assert!(!lock.is_locked());
    assert!(task.has_completed_successfully());
}

#[tokio::test]
async fn test_failure_releases_lock_and_resolves_task() {
    let (lock, task, cycle) = locked_cycle().await;

    cycle
        .failure(CoordinationError::Unreachable("down".to_string()).into())
        .await;

    assert_eq!(cycle.state(), CycleState::Failed);
    assert!(!lock.is_locked());
    assert!(task.error().is_some());
}

#[tokio::test]
async fn test_failure_without_the_lock_does_not_release_it() {
    // The lock is held by some other cycle; this cycle never acquired it
    let lock = Arc::new(DistributedLock::new(
        MemoryCoordination::new(),
        "/news/lock".to_string(),
        Duration::from_millis(100),
    ));
    lock.acquire_lock().await.unwrap();

    let task = Arc::new(AsyncTask::new());
    let cycle = NotificationCycle::new("news".to_string(), lock.clone(), task.clone());
    cycle
        .failure(CoordinationError::Unreachable("down".to_string()).into())
        .await;

    assert_eq!(cycle.state(), CycleState::Failed);
    assert!(task.error().is_some());
    assert!(lock.is_locked(), "the holder's lock must survive this failure");
}

#[tokio::test]
async fn test_only_the_first_transition_wins() {
    let (_lock, task, cycle) = locked_cycle().await;
    let successes = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let s = successes.clone();
    let e = errors.clone();
    task.when_complete(move || {
        s.fetch_add(1, Ordering::SeqCst);
    });
    task.when_error(move |_| {
        e.fetch_add(1, Ordering::SeqCst);
    });

    cycle.success().await;
    cycle
        .failure(CoordinationError::Unreachable("late".to_string()).into())
        .await;
    cycle.success().await;

    assert_eq!(cycle.state(), CycleState::Successful);
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}
