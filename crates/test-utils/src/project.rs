use std::path::{Path, PathBuf};
use std::sync::Arc;

use bistro::engine::TaskEnv;
use bistro::fs::mock::MockFileSystem;
use bistro::watch::MockWatchBackend;
use bistro::{Bistro, BistroOptions, TaskSet};

/// In-memory project rooted at `/project`.
///
/// Writes go to both the mock file system (contents) and the mock watch
/// backend (events).
#[derive(Debug, Clone)]
pub struct MockProject {
    pub root: PathBuf,
    pub backend: MockWatchBackend,
    pub fs: MockFileSystem,
}

impl Default for MockProject {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProject {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/project"),
            backend: MockWatchBackend::new(),
            fs: MockFileSystem::new(),
        }
    }

    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Create or modify a file.
    pub fn write(&self, rel: impl AsRef<Path>, contents: &str) -> PathBuf {
        let path = self.path(rel);
        self.fs.add_file(&path, contents);
        self.backend.add_file(&path);
        path
    }

    pub fn remove(&self, rel: impl AsRef<Path>) -> PathBuf {
        let path = self.path(rel);
        self.fs.remove_file(&path);
        self.backend.remove_file(&path);
        path
    }

    pub fn options(&self) -> BistroOptions {
        BistroOptions::new().base_dir(&self.root)
    }

    pub fn env(&self) -> TaskEnv {
        TaskEnv {
            base_dir: self.root.clone(),
            backend: Arc::new(self.backend.clone()),
            fs: Arc::new(self.fs.clone()),
        }
    }

    pub fn bistro(&self, tasks: TaskSet, options: BistroOptions) -> bistro::errors::Result<Bistro> {
        Bistro::with_backends(
            tasks,
            options,
            Arc::new(self.backend.clone()),
            Arc::new(self.fs.clone()),
        )
    }
}
