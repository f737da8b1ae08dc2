mod common;

use std::sync::Arc;
use std::time::Duration;

use bistro::engine::ChangeQueue;
use common::{with_timeout, TestResult};

#[test]
fn add_is_idempotent() {
    let queue: ChangeQueue<&str> = ChangeQueue::new();
    queue.add("a");
    queue.add("a");
    assert_eq!(queue.len(), 1);
    assert!(queue.contains(&"a"));
}

#[test]
fn removing_last_item_drains_once() {
    let queue: ChangeQueue<&str> = ChangeQueue::new();
    queue.add("a");
    queue.add("b");

    queue.remove(&"a");
    assert_eq!(queue.drain_count(), 0);

    queue.remove(&"b");
    assert_eq!(queue.drain_count(), 1);
    assert!(queue.is_empty());
}

#[test]
fn removing_absent_token_never_drains() {
    let queue: ChangeQueue<&str> = ChangeQueue::new();
    queue.remove(&"ghost");
    assert_eq!(queue.drain_count(), 0);

    queue.add("a");
    queue.remove(&"ghost");
    assert_eq!(queue.drain_count(), 0);
    assert_eq!(queue.len(), 1);
}

#[test]
fn queue_re_arms_after_each_drain() {
    let queue: ChangeQueue<&str> = ChangeQueue::new();

    queue.add("a");
    queue.remove(&"a");
    queue.add("b");
    queue.remove(&"b");

    assert_eq!(queue.drain_count(), 2);
}

#[tokio::test]
async fn subscribers_observe_every_drain() -> TestResult {
    let queue: ChangeQueue<&str> = ChangeQueue::new();
    let mut rx = queue.subscribe();

    queue.add("a");
    queue.remove(&"a");
    with_timeout(rx.changed()).await?;
    assert_eq!(*rx.borrow_and_update(), 1);

    queue.add("b");
    queue.remove(&"b");
    with_timeout(rx.changed()).await?;
    assert_eq!(*rx.borrow_and_update(), 2);
    Ok(())
}

#[tokio::test]
async fn wait_drained_resolves_immediately_when_empty() {
    let queue: ChangeQueue<&str> = ChangeQueue::new();
    with_timeout(queue.wait_drained()).await;
}

#[tokio::test]
async fn wait_drained_waits_for_in_flight_work() {
    let queue = Arc::new(ChangeQueue::<String>::new());
    queue.add("slow".to_string());

    let remover = Arc::clone(&queue);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        remover.remove(&"slow".to_string());
    });

    with_timeout(queue.wait_drained()).await;
    assert!(queue.is_empty());
    assert_eq!(queue.drain_count(), 1);
}
