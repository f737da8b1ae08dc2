// src/watch/mock.rs

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::watch::files::WatchedFiles;
use crate::watch::patterns::PatternMatcher;
use crate::watch::source::{WatchBackend, WatchEvent, WatchHandle, WatchSubscription};

/// In-memory watch backend driven by the test.
///
/// Files are plain paths; contents live elsewhere (see
/// [`crate::fs::mock::MockFileSystem`]). Every open subscription whose
/// pattern matches a touched path receives the corresponding event.
#[derive(Debug, Clone, Default)]
pub struct MockWatchBackend {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    files: BTreeSet<PathBuf>,
    failing: HashSet<String>,
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    base_dir: PathBuf,
    matcher: PatternMatcher,
    watched: Arc<Mutex<WatchedFiles>>,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl Subscriber {
    fn matches(&self, path: &Path) -> bool {
        path.strip_prefix(&self.base_dir)
            .map(|rel| self.matcher.matches(&rel.to_string_lossy().replace('\\', "/")))
            .unwrap_or(false)
    }
}

impl MockWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every future `watch` call with this pattern fail.
    pub fn fail_on(&self, pattern: &str) {
        self.lock().failing.insert(pattern.to_string());
    }

    /// Create a file, or modify it if it already exists.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        if !state.files.insert(path.clone()) {
            drop(state);
            self.change_file(path);
            return;
        }
        for sub in state.subscribers.iter().filter(|s| s.matches(&path)) {
            lock(&sub.watched).insert(&path);
            let _ = sub.tx.send(WatchEvent::Add(path.clone()));
        }
    }

    /// Modify an existing file. Unknown paths are ignored.
    pub fn change_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let state = self.lock();
        if !state.files.contains(path) {
            return;
        }
        for sub in state.subscribers.iter().filter(|s| s.matches(path)) {
            let _ = sub.tx.send(WatchEvent::Change(path.to_path_buf()));
        }
    }

    /// Delete a file. Unknown paths are ignored.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if !state.files.remove(path) {
            return;
        }
        for sub in state.subscribers.iter().filter(|s| s.matches(path)) {
            lock(&sub.watched).remove(path);
            let _ = sub.tx.send(WatchEvent::Unlink(path.to_path_buf()));
        }
    }

    /// Number of subscriptions that have not been closed.
    pub fn open_subscriptions(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Patterns of the open subscriptions, in the order they were opened.
    pub fn watched_patterns(&self) -> Vec<String> {
        self.lock()
            .subscribers
            .iter()
            .map(|s| s.matcher.pattern().to_string())
            .collect()
    }
}

impl WatchBackend for MockWatchBackend {
    fn watch(&self, base_dir: &Path, pattern: &str) -> Result<WatchSubscription> {
        let mut state = self.lock();
        if state.failing.contains(pattern) {
            return Err(anyhow!("mock watch failure for pattern '{}'", pattern));
        }
        let matcher = PatternMatcher::new(pattern)?;

        let (tx, events) = mpsc::unbounded_channel();
        let id = state.next_id;
        state.next_id += 1;

        let subscriber = Subscriber {
            id,
            base_dir: base_dir.to_path_buf(),
            matcher,
            watched: Arc::new(Mutex::new(WatchedFiles::new())),
            tx,
        };

        let initial: Vec<PathBuf> = state
            .files
            .iter()
            .filter(|p| subscriber.matches(p))
            .cloned()
            .collect();
        *lock(&subscriber.watched) = initial.iter().collect();
        for path in initial {
            let _ = subscriber.tx.send(WatchEvent::Add(path));
        }
        let _ = subscriber.tx.send(WatchEvent::Ready);

        let handle = MockWatchHandle {
            id,
            watched: Arc::clone(&subscriber.watched),
            backend: self.clone(),
        };
        state.subscribers.push(subscriber);

        Ok(WatchSubscription {
            events,
            handle: Box::new(handle),
        })
    }
}

struct MockWatchHandle {
    id: u64,
    watched: Arc<Mutex<WatchedFiles>>,
    backend: MockWatchBackend,
}

impl WatchHandle for MockWatchHandle {
    fn watched(&self) -> Vec<PathBuf> {
        lock(&self.watched).to_vec()
    }

    fn close(&self) {
        // Dropping the sender ends the subscriber's event stream.
        self.backend.lock().subscribers.retain(|s| s.id != self.id);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
