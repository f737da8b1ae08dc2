// src/engine/task.rs

//! One watched pattern with its `update` / `remove` reactions.
//!
//! A task never knows about other tasks. It turns watch events into
//! [`ChangeEvent`]s for the orchestrator and runs its own reactions when
//! asked to through [`Task::exec`] and [`Task::run`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, trace};

use super::queue::ChangeQueue;
use super::reaction::{Invocation, Reaction, ReactionContext};
use super::{ChangeEvent, TaskEvent, TaskName};
use crate::config::model::TaskConfig;
use crate::errors::{BistroError, BoxError, Result};
use crate::fs::FileSystem;
use crate::types::Method;
use crate::watch::{WatchBackend, WatchEvent, WatchHandle};

const EVENT_CAPACITY: usize = 64;

/// Lifecycle of a [`Task`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Uninitialized,
    Watching,
    Stopped,
}

/// Environment a task runs in, shared by every task of one orchestrator.
#[derive(Debug, Clone)]
pub struct TaskEnv {
    pub base_dir: PathBuf,
    pub backend: Arc<dyn WatchBackend>,
    pub fs: Arc<dyn FileSystem>,
}

pub struct Task {
    name: TaskName,
    pattern: String,
    read: bool,
    dependencies: Vec<TaskName>,
    on_update: Arc<dyn Reaction>,
    on_remove: Arc<dyn Reaction>,
    context: ReactionContext,
    env: TaskEnv,
    queue: ChangeQueue<PathBuf>,
    state: Mutex<TaskState>,
    handle: Mutex<Option<Box<dyn WatchHandle>>>,
    run_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<TaskEvent>,
    shutdown: watch::Sender<bool>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("read", &self.read)
            .field("dependencies", &self.dependencies)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn new(name: impl Into<TaskName>, config: &TaskConfig, env: TaskEnv) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        Self {
            name: name.into(),
            pattern: config.pattern.clone(),
            read: config.read,
            dependencies: config.run.clone(),
            on_update: Arc::clone(&config.update),
            on_remove: Arc::clone(&config.remove),
            context: config.context.clone(),
            env,
            queue: ChangeQueue::new(),
            state: Mutex::new(TaskState::Uninitialized),
            handle: Mutex::new(None),
            run_lock: tokio::sync::Mutex::new(()),
            events,
            shutdown,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn reads_contents(&self) -> bool {
        self.read
    }

    /// The task's `run` list: tasks that re-run after this one.
    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn base_dir(&self) -> &Path {
        &self.env.base_dir
    }

    pub fn state(&self) -> TaskState {
        *lock(&self.state)
    }

    pub fn queue(&self) -> &ChangeQueue<PathBuf> {
        &self.queue
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Files the watch currently matches, sorted. Empty before `init` and
    /// after `stop`.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        lock(&self.handle)
            .as_ref()
            .map(|h| h.watched())
            .unwrap_or_default()
    }

    /// Start watching and wait for the startup scan.
    ///
    /// Files present at startup are only registered; their reactions run on
    /// the next [`Task::run`]. Later changes are sent on `changes`.
    pub async fn init(&self, changes: mpsc::UnboundedSender<ChangeEvent>) -> Result<()> {
        match self.state() {
            TaskState::Stopped => return Err(BistroError::TaskStopped(self.name.clone())),
            TaskState::Watching => return Ok(()),
            TaskState::Uninitialized => {}
        }

        let subscription = self
            .env
            .backend
            .watch(&self.env.base_dir, &self.pattern)
            .map_err(|err| BistroError::WatchSetup {
                task: self.name.clone(),
                pattern: self.pattern.clone(),
                source: err.into(),
            })?;

        {
            let mut state = lock(&self.state);
            if *state == TaskState::Stopped {
                subscription.handle.close();
                return Err(BistroError::TaskStopped(self.name.clone()));
            }
            *state = TaskState::Watching;
            *lock(&self.handle) = Some(subscription.handle);
        }

        debug!(
            task = %self.name,
            pattern = %self.pattern,
            base_dir = ?self.env.base_dir,
            "watching"
        );

        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(pump(
            self.name.clone(),
            subscription.events,
            changes,
            self.shutdown.subscribe(),
            ready_tx,
        ));

        if ready_rx.await.is_err() {
            return Err(BistroError::TaskStopped(self.name.clone()));
        }

        self.queue.wait_drained().await;
        let _ = self.events.send(TaskEvent::Ready);
        debug!(task = %self.name, files = self.watched_files().len(), "task ready");
        Ok(())
    }

    /// Run the reaction bound to `method` for one file.
    ///
    /// The path is tracked in the task's queue for the duration of the call,
    /// whether the reaction succeeds or not.
    pub async fn exec(&self, method: Method, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        self.queue.add(path.clone());

        let result = self.invoke(method, &path).await;
        if result.is_ok() {
            let _ = self.events.send(TaskEvent::Done {
                method,
                path: path.clone(),
            });
        }

        self.queue.remove(&path);
        result
    }

    async fn invoke(&self, method: Method, path: &Path) -> Result<()> {
        let contents = if method == Method::Update && self.read {
            let text = self
                .env
                .fs
                .read_to_string(path)
                .map_err(|err| self.reaction_error(path, err.into()))?;
            Some(text)
        } else {
            None
        };

        let invocation = Invocation {
            task: self.name.clone(),
            method,
            name: file_stem(path),
            path: path.to_path_buf(),
            contents,
            context: self.context.clone(),
        };

        let reaction = match method {
            Method::Update => &self.on_update,
            Method::Remove => &self.on_remove,
        };

        trace!(task = %self.name, %method, path = ?path, "running reaction");
        reaction
            .call(invocation)
            .await
            .map_err(|err| self.reaction_error(path, err.into()))
    }

    fn reaction_error(&self, path: &Path, source: BoxError) -> BistroError {
        BistroError::Reaction {
            task: self.name.clone(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Run `update` for every watched file, one after another.
    ///
    /// Full runs of one task never overlap. The first failing file aborts the
    /// run.
    pub async fn run(&self) -> Result<()> {
        let _guard = self.run_lock.lock().await;
        let files = self.watched_files();
        debug!(task = %self.name, files = files.len(), "running task over watched files");

        for path in files {
            self.exec(Method::Update, &path).await?;
        }
        Ok(())
    }

    /// Release the watch. No further change events are sent. Idempotent.
    pub fn stop(&self) {
        {
            let mut state = lock(&self.state);
            if *state == TaskState::Stopped {
                return;
            }
            *state = TaskState::Stopped;
        }

        if let Some(handle) = lock(&self.handle).take() {
            handle.close();
        }
        self.shutdown.send_replace(true);
        debug!(task = %self.name, "task stopped");
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.handle).take() {
            handle.close();
        }
    }
}

/// Forward a task's watch events until the watch ends or the task stops.
async fn pump(
    task: TaskName,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    changes: mpsc::UnboundedSender<ChangeEvent>,
    mut shutdown: watch::Receiver<bool>,
    ready: oneshot::Sender<()>,
) {
    let mut ready = Some(ready);

    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let (method, path) = match event {
            WatchEvent::Ready => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(());
                }
                continue;
            }
            // Startup files are delivered by the first full run.
            WatchEvent::Add(path) | WatchEvent::Unlink(path) if ready.is_some() => {
                trace!(task = %task, path = ?path, "startup file registered");
                continue;
            }
            WatchEvent::Add(path) | WatchEvent::Change(path) => (Method::Update, path),
            WatchEvent::Unlink(path) => (Method::Remove, path),
        };

        if *shutdown.borrow() {
            break;
        }

        let change = ChangeEvent {
            task: task.clone(),
            method,
            path,
        };
        if changes.send(change).is_err() {
            break;
        }
    }

    trace!(task = %task, "watch event pump finished");
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
