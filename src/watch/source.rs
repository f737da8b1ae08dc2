// src/watch/source.rs

//! Abstract event source behind every task's watch.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::mpsc;

/// Raw file notification for one watched pattern. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A matching file appeared (also emitted for every pre-existing file
    /// before `Ready`).
    Add(PathBuf),
    /// A known matching file was modified.
    Change(PathBuf),
    /// A known matching file was deleted.
    Unlink(PathBuf),
    /// The startup scan is complete.
    Ready,
}

/// Live side of a watch: enumerates matches and stops delivery.
pub trait WatchHandle: Send + Sync {
    /// Files currently matched by the pattern, sorted.
    fn watched(&self) -> Vec<PathBuf>;

    /// Stop delivering events. Idempotent.
    fn close(&self);
}

/// Result of starting a watch.
pub struct WatchSubscription {
    pub events: mpsc::UnboundedReceiver<WatchEvent>,
    pub handle: Box<dyn WatchHandle>,
}

impl Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription").finish_non_exhaustive()
    }
}

/// Something that can watch `base_dir` for files matching a glob.
///
/// Implementations must report every pre-existing matching file as
/// [`WatchEvent::Add`] and then exactly one [`WatchEvent::Ready`] before any
/// later change.
pub trait WatchBackend: Send + Sync + Debug {
    fn watch(&self, base_dir: &Path, pattern: &str) -> Result<WatchSubscription>;
}
