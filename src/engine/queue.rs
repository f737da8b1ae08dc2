// src/engine/queue.rs

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::trace;

/// Set of in-flight work items that signals every time it drains.
///
/// Semantics:
/// - `add` is idempotent: the same token registered twice is one item.
/// - `remove` of the last item bumps the drain counter exactly once.
/// - `remove` of an absent token is a no-op and never drains.
/// - The queue re-arms on its own, so every non-empty -> empty transition
///   over its lifetime is observable.
///
/// Tokens are file paths for tasks, but any hashable value works.
pub struct ChangeQueue<T = PathBuf> {
    items: Mutex<HashSet<T>>,
    drains: watch::Sender<u64>,
}

impl<T> fmt::Debug for ChangeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeQueue")
            .field("len", &self.lock().len())
            .field("drains", &*self.drains.borrow())
            .finish()
    }
}

impl<T> Default for ChangeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChangeQueue<T> {
    pub fn new() -> Self {
        let (drains, _rx) = watch::channel(0);
        Self {
            items: Mutex::new(HashSet::new()),
            drains,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of drains observed so far.
    pub fn drain_count(&self) -> u64 {
        *self.drains.borrow()
    }

    /// Receiver whose value is the drain counter.
    ///
    /// `changed()` resolves once per drain that happens after the last
    /// `borrow_and_update`.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.drains.subscribe()
    }

    /// Resolve immediately if nothing is in flight, otherwise on the next
    /// drain.
    pub async fn wait_drained(&self) {
        // Subscribe before checking so a drain between the two is not lost.
        let mut rx = self.drains.subscribe();
        if self.is_empty() {
            return;
        }
        while rx.changed().await.is_ok() {
            if self.is_empty() {
                return;
            }
        }
    }
}

impl<T: Eq + Hash> ChangeQueue<T> {
    /// Register a work item.
    pub fn add(&self, token: T) {
        self.lock().insert(token);
    }

    /// Deregister a work item, signalling a drain if it was the last one.
    pub fn remove(&self, token: &T) {
        let drained = {
            let mut items = self.lock();
            items.remove(token) && items.is_empty()
        };

        if drained {
            // `send_modify` updates the value even with no receivers alive.
            self.drains.send_modify(|count| *count += 1);
            trace!(drains = self.drain_count(), "change queue drained");
        }
    }

    pub fn contains(&self, token: &T) -> bool {
        self.lock().contains(token)
    }
}
