// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::files::WatchedFiles;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, PatternMatcher};
use crate::watch::source::{WatchBackend, WatchEvent, WatchHandle, WatchSubscription};

/// Quiet period before a burst of raw events is handed on.
pub const DEBOUNCE: Duration = Duration::from_millis(200);

type FileDebouncer = Debouncer<RecommendedWatcher, RecommendedCache>;

/// Watch backend on top of `notify`'s recommended platform watcher.
///
/// Each call to [`WatchBackend::watch`] starts its own debounced recursive
/// watcher on the base directory. Every path in a debounced burst is
/// classified once, against the set of files the pattern currently matches:
///
/// - an existing file not seen before is an `Add`
/// - an existing known file is a `Change` (metadata-only events are ignored)
/// - a known file that is gone is an `Unlink`
#[derive(Debug, Clone)]
pub struct NotifyWatchBackend {
    fs: Arc<dyn FileSystem>,
}

impl Default for NotifyWatchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyWatchBackend {
    pub fn new() -> Self {
        Self {
            fs: Arc::new(RealFileSystem),
        }
    }
}

impl WatchBackend for NotifyWatchBackend {
    fn watch(&self, base_dir: &Path, pattern: &str) -> Result<WatchSubscription> {
        let matcher = PatternMatcher::new(pattern)?;

        // Canonicalize once so we have a stable base path.
        let root = self.fs.canonicalize(base_dir)?;

        // Channel from the blocking debouncer thread into the async world.
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<DebounceEventResult>();
        let mut debouncer = new_debouncer(DEBOUNCE, None, move |res: DebounceEventResult| {
            // The receiver is gone once the watch was closed.
            let _ = raw_tx.send(res);
        })?;
        debouncer.watch(&root, RecursiveMode::Recursive)?;

        // Scan only once the watch is live so no file falls between the two.
        let initial = collect_matching_files(self.fs.as_ref(), &root, &matcher)
            .with_context(|| format!("scanning {:?} for '{}'", root, pattern))?;
        let known = Arc::new(Mutex::new(initial.iter().collect::<WatchedFiles>()));

        info!(root = ?root, pattern = %matcher.pattern(), "file watcher started");

        let (tx, events) = mpsc::unbounded_channel();
        for path in initial {
            let _ = tx.send(WatchEvent::Add(path));
        }
        let _ = tx.send(WatchEvent::Ready);

        let closed = Arc::new(AtomicBool::new(false));

        let translator = Translator {
            root,
            matcher,
            fs: Arc::clone(&self.fs),
            known: Arc::clone(&known),
            tx,
        };
        let loop_closed = Arc::clone(&closed);
        tokio::spawn(async move {
            while let Some(res) = raw_rx.recv().await {
                if loop_closed.load(Ordering::SeqCst) {
                    break;
                }
                match res {
                    Ok(events) => {
                        if !translator.handle(&events) {
                            break;
                        }
                    }
                    Err(errors) => {
                        for err in errors {
                            warn!(error = %err, "file watch error");
                        }
                    }
                }
            }
            debug!(pattern = %translator.matcher.pattern(), "watcher event loop finished");
        });

        Ok(WatchSubscription {
            events,
            handle: Box::new(NotifyWatchHandle {
                debouncer: Mutex::new(Some(debouncer)),
                known,
                closed,
            }),
        })
    }
}

struct Translator {
    root: PathBuf,
    matcher: PatternMatcher,
    fs: Arc<dyn FileSystem>,
    known: Arc<Mutex<WatchedFiles>>,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl Translator {
    /// Translate one debounced burst. Returns `false` once the subscriber has
    /// gone away.
    fn handle(&self, events: &[DebouncedEvent]) -> bool {
        for path in self.affected_paths(events) {
            let translated = {
                let mut known = lock(&self.known);
                match (self.fs.is_file(&path), known.contains(&path)) {
                    (true, false) => {
                        known.insert(&path);
                        Some(WatchEvent::Add(path))
                    }
                    (true, true) => Some(WatchEvent::Change(path)),
                    (false, true) => {
                        known.remove(&path);
                        Some(WatchEvent::Unlink(path))
                    }
                    (false, false) => None,
                }
            };

            if let Some(ev) = translated {
                if self.tx.send(ev).is_err() {
                    return false;
                }
            }
        }
        true
    }

    /// Matching paths touched by a burst, each once, in first-seen order.
    ///
    /// A create followed by a write of the same file collapses into one path.
    fn affected_paths(&self, events: &[DebouncedEvent]) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();

        for event in events {
            match event.kind {
                EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) => continue,
                _ => {}
            }
            trace!(event = ?event.event, "received notify event");

            for raw in &event.paths {
                let Some(rel) = relative_str(&self.root, raw) else {
                    continue;
                };
                if !self.matcher.matches(&rel) {
                    continue;
                }
                let path = self.root.join(&rel);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }
}

struct NotifyWatchHandle {
    debouncer: Mutex<Option<FileDebouncer>>,
    known: Arc<Mutex<WatchedFiles>>,
    closed: Arc<AtomicBool>,
}

impl WatchHandle for NotifyWatchHandle {
    fn watched(&self) -> Vec<PathBuf> {
        lock(&self.known).to_vec()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the debouncer stops its thread and ends the event loop.
        drop(lock(&self.debouncer).take());
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
