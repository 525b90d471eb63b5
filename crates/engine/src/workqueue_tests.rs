// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work queue contract tests: dedup, single-flight, backoff, shutdown.

use super::*;
use std::time::Duration;

#[tokio::test]
async fn items_come_out_in_order() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.add("a".to_string());
    queue.add("b".to_string());
    assert_eq!(queue.get().await.as_deref(), Some("a"));
    assert_eq!(queue.get().await.as_deref(), Some("b"));
}

#[tokio::test]
async fn duplicate_adds_collapse_while_queued() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.add("a".to_string());
    queue.add("a".to_string());
    queue.add("a".to_string());
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn add_while_processing_requeues_on_done() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.add("a".to_string());
    let item = queue.get().await.unwrap();

    // re-added while in flight: parked, not queued
    queue.add("a".to_string());
    assert_eq!(queue.len(), 0);

    queue.done(&item);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.get().await.as_deref(), Some("a"));
}

#[tokio::test]
async fn done_without_readd_does_not_requeue() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.add("a".to_string());
    let item = queue.get().await.unwrap();
    queue.done(&item);
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn add_after_delays_delivery() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.add_after("a".to_string(), Duration::from_secs(10));
    tokio::task::yield_now().await;
    assert!(queue.is_empty());

    tokio::time::advance(Duration::from_secs(11)).await;
    tokio::task::yield_now().await;
    assert_eq!(queue.get().await.as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_backoff_grows_per_item() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.add_rate_limited("a".to_string());
    assert_eq!(queue.num_requeues(&"a".to_string()), 1);

    tokio::time::advance(Duration::from_millis(6)).await;
    tokio::task::yield_now().await;
    assert_eq!(queue.get().await.as_deref(), Some("a"));
    queue.done(&"a".to_string());

    // second failure doubles the delay: 10ms
    queue.add_rate_limited("a".to_string());
    assert_eq!(queue.num_requeues(&"a".to_string()), 2);
    tokio::time::advance(Duration::from_millis(6)).await;
    tokio::task::yield_now().await;
    assert!(queue.is_empty());
    tokio::time::advance(Duration::from_millis(6)).await;
    tokio::task::yield_now().await;
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn forget_resets_failure_count() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.add_rate_limited("a".to_string());
    queue.add_rate_limited("a".to_string());
    assert_eq!(queue.num_requeues(&"a".to_string()), 2);
    queue.forget(&"a".to_string());
    assert_eq!(queue.num_requeues(&"a".to_string()), 0);
}

#[tokio::test]
async fn shutdown_wakes_waiting_workers() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.get().await })
    };
    tokio::task::yield_now().await;
    queue.shut_down();
    assert_eq!(waiter.await.unwrap(), None);
}

#[tokio::test]
async fn adds_after_shutdown_are_dropped() {
    let queue: Arc<WorkQueue<String>> = WorkQueue::new();
    queue.shut_down();
    queue.add("a".to_string());
    assert!(queue.is_empty());
    assert_eq!(queue.get().await, None);
}
