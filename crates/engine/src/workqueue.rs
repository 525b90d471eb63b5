// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limited deduplicating work queue.
//!
//! The contract: adds of a key collapse while the key is queued; a key
//! being processed is re-queued on `done` if it was re-added meanwhile, so
//! the same key is never processed by two workers at once. Per-item
//! failure counts drive exponential backoff, reset by `forget`.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Base delay of the per-item exponential backoff.
const BASE_DELAY: Duration = Duration::from_millis(5);

/// Ceiling of the per-item exponential backoff.
const MAX_DELAY: Duration = Duration::from_secs(1000);

struct Inner<T> {
    queue: VecDeque<T>,
    dirty: HashSet<T>,
    processing: HashSet<T>,
    failures: HashMap<T, u32>,
    shut_down: bool,
}

/// A work queue with per-key single-flight and per-item backoff.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    ready: Semaphore,
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(WorkQueue {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                shut_down: false,
            }),
            ready: Semaphore::new(0),
        })
    }

    /// Add an item. Collapses with an already-queued copy; an item being
    /// processed is parked and re-queued when its processing finishes.
    pub fn add(&self, item: T) {
        let mut inner = self.inner.lock();
        if inner.shut_down || inner.dirty.contains(&item) {
            return;
        }
        inner.dirty.insert(item.clone());
        if inner.processing.contains(&item) {
            return;
        }
        inner.queue.push_back(item);
        self.ready.add_permits(1);
    }

    /// Wait for the next item. Returns `None` after shutdown.
    pub async fn get(&self) -> Option<T> {
        let permit = self.ready.acquire().await.ok()?;
        permit.forget();
        let mut inner = self.inner.lock();
        let item = inner.queue.pop_front()?;
        inner.dirty.remove(&item);
        inner.processing.insert(item.clone());
        Some(item)
    }

    /// Mark an item's processing finished, re-queueing it if it was added
    /// again in the meantime.
    pub fn done(&self, item: &T) {
        let mut inner = self.inner.lock();
        inner.processing.remove(item);
        if inner.dirty.contains(item) && !inner.shut_down {
            inner.queue.push_back(item.clone());
            self.ready.add_permits(1);
        }
    }

    /// Add an item after a fixed delay.
    pub fn add_after(self: &Arc<Self>, item: T, delay: Duration) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Add an item after its per-item exponential backoff
    /// (5ms·2^(n−1), capped at 1000s).
    pub fn add_rate_limited(self: &Arc<Self>, item: T) {
        let failures = {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return;
            }
            let count = inner.failures.entry(item.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let exp = failures.saturating_sub(1).min(63);
        let delay = BASE_DELAY
            .checked_mul(1u32.checked_shl(exp).unwrap_or(u32::MAX))
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY);
        self.add_after(item, delay);
    }

    /// Number of times the item has been re-queued with backoff.
    pub fn num_requeues(&self, item: &T) -> u32 {
        self.inner.lock().failures.get(item).copied().unwrap_or(0)
    }

    /// Clear the item's failure history.
    pub fn forget(&self, item: &T) {
        self.inner.lock().failures.remove(item);
    }

    /// Stop accepting items and wake all waiting workers.
    pub fn shut_down(&self) {
        let mut inner = self.inner.lock();
        inner.shut_down = true;
        inner.queue.clear();
        self.ready.close();
    }

    /// Queued (not in-flight) item count.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }
}

#[cfg(test)]
#[path = "workqueue_tests.rs"]
mod tests;
