// src/engine/bistro.rs

//! The orchestrator: starts tasks in dependency order and cascades
//! re-execution through dependants after every change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::task::{Task, TaskEnv};
use super::{ChangeEvent, TaskName};
use crate::config::model::{BistroOptions, FinishCallback, TaskSet};
use crate::config::validate::validate_task_set;
use crate::dag::DependencyGraph;
use crate::errors::{BistroError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::TraceLog;
use crate::types::{FinishEvent, Method};
use crate::watch::path_utils::absolutize;
use crate::watch::{NotifyWatchBackend, WatchBackend};

/// Task runner over a fixed set of tasks.
///
/// Cloning is cheap; clones share the same tasks.
#[derive(Clone)]
pub struct Bistro {
    shared: Arc<Shared>,
}

struct Shared {
    configs: TaskSet,
    graph: DependencyGraph,
    base_dir: PathBuf,
    on_task_finish: Option<FinishCallback>,
    log: TraceLog,
    backend: Arc<dyn WatchBackend>,
    fs: Arc<dyn FileSystem>,
    tasks: RwLock<HashMap<TaskName, Arc<Task>>>,
    changes_tx: mpsc::UnboundedSender<ChangeEvent>,
    changes_rx: Mutex<Option<mpsc::UnboundedReceiver<ChangeEvent>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl std::fmt::Debug for Bistro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bistro")
            .field("tasks", &self.shared.graph.overall_order())
            .field("base_dir", &self.shared.base_dir)
            .field("started", &self.is_started())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Bistro {
    /// Orchestrator that watches the real file system through `notify`.
    pub fn new(tasks: TaskSet, options: BistroOptions) -> Result<Self> {
        Self::with_backends(
            tasks,
            options,
            Arc::new(NotifyWatchBackend::new()),
            Arc::new(RealFileSystem),
        )
    }

    /// Orchestrator with explicit watch and file system backends.
    ///
    /// Fails if a pattern is invalid, a `run` list names an unknown task, or
    /// the tasks form a cycle.
    pub fn with_backends(
        tasks: TaskSet,
        options: BistroOptions,
        backend: Arc<dyn WatchBackend>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let graph = validate_task_set(&tasks)?;

        let cwd = std::env::current_dir()?;
        let base_dir = match &options.base_dir {
            Some(dir) => absolutize(&cwd, dir),
            None => cwd,
        };

        let (changes_tx, changes_rx) = mpsc::unbounded_channel();

        debug!(tasks = graph.len(), base_dir = ?base_dir, "orchestrator created");

        Ok(Self {
            shared: Arc::new(Shared {
                configs: tasks,
                graph,
                base_dir,
                on_task_finish: options.on_task_finish,
                log: TraceLog::new(options.verbose),
                backend,
                fs,
                tasks: RwLock::new(HashMap::new()),
                changes_tx,
                changes_rx: Mutex::new(Some(changes_rx)),
                dispatcher: Mutex::new(None),
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.shared.graph
    }

    pub fn base_dir(&self) -> &Path {
        &self.shared.base_dir
    }

    /// Task names in startup order.
    pub fn task_names(&self) -> Vec<TaskName> {
        self.shared.graph.overall_order()
    }

    /// A started task, if it has been created yet.
    pub fn task(&self, name: &str) -> Option<Arc<Task>> {
        self.shared
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Start every task in dependency order and run each one once over its
    /// matching files.
    ///
    /// Resolves after the last task's startup run, once the finish callback
    /// has received the bulk event.
    pub async fn start(&self) -> Result<()> {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(BistroError::AlreadyStarted);
        }

        self.spawn_dispatcher();

        let order = self.shared.graph.overall_order();
        self.shared.log.log(format_args!("Initializing tasks {}", order.join(", ")));

        for name in &order {
            if self.is_stopped() {
                return Err(BistroError::TaskStopped(name.clone()));
            }

            let config = self
                .shared
                .configs
                .get(name)
                .ok_or_else(|| BistroError::TaskNotFound(name.clone()))?;
            let task = Arc::new(Task::new(name.clone(), config, self.task_env()));

            self.shared
                .tasks
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name.clone(), Arc::clone(&task));

            task.init(self.shared.changes_tx.clone()).await?;
            task.run().await?;
            self.shared.log.log(format_args!("Initialized task {}", name));
        }

        self.finish(&FinishEvent::bulk(order));
        self.shared.log.log(format_args!("All tasks initialized"));
        info!(tasks = self.shared.graph.len(), "startup complete");
        Ok(())
    }

    /// Run one task for one file, then fully re-run every task that depends
    /// on it, in order.
    ///
    /// Dependants that have not been started yet are skipped.
    pub async fn run_task(&self, name: &str, method: Method, path: &Path) -> Result<()> {
        let task = self
            .task(name)
            .ok_or_else(|| BistroError::TaskNotFound(name.to_string()))?;
        let dependencies = self.shared.graph.dependants_of(name)?;

        self.shared.log.log(format_args!(
            "Running task {} on {}",
            name,
            file_name(path)
        ));

        task.exec(method, path).await?;

        self.shared.log.log(format_args!(
            "Done running task {}, now running dependencies {}",
            name,
            dependencies.join(", ")
        ));

        for dependant in &dependencies {
            match self.task(dependant) {
                Some(task) => task.run().await?,
                None => debug!(task = %dependant, "dependant not started yet; skipping"),
            }
        }

        self.finish(&FinishEvent {
            task_name: Some(name.to_string()),
            method: Some(method),
            dependencies,
            file_name: Some(path.to_path_buf()),
        });
        self.shared.log.log(format_args!("Done running dependencies of {}", name));
        Ok(())
    }

    /// Stop the dispatcher and every task. Idempotent.
    ///
    /// Work already in progress runs to completion.
    pub fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.log.log(format_args!("Stopping all tasks"));

        if let Some(handle) = lock(&self.shared.dispatcher).take() {
            handle.abort();
        }

        let tasks: Vec<Arc<Task>> = self
            .shared
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for task in tasks {
            task.stop();
        }

        self.shared.log.log(format_args!("Stopped all tasks"));
    }

    fn task_env(&self) -> TaskEnv {
        TaskEnv {
            base_dir: self.shared.base_dir.clone(),
            backend: Arc::clone(&self.shared.backend),
            fs: Arc::clone(&self.shared.fs),
        }
    }

    fn finish(&self, event: &FinishEvent) {
        if let Some(callback) = &self.shared.on_task_finish {
            callback(event);
        }
    }

    fn spawn_dispatcher(&self) {
        let Some(rx) = lock(&self.shared.changes_rx).take() else {
            return;
        };
        let handle = tokio::spawn(dispatch(Arc::downgrade(&self.shared), rx));
        *lock(&self.shared.dispatcher) = Some(handle);
    }
}

/// Receive change events from every task and start one cascade per event.
async fn dispatch(shared: Weak<Shared>, mut rx: mpsc::UnboundedReceiver<ChangeEvent>) {
    while let Some(change) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if shared.stopped.load(Ordering::SeqCst) {
            break;
        }

        let bistro = Bistro { shared };
        tokio::spawn(async move {
            let ChangeEvent { task, method, path } = change;
            if let Err(err) = bistro.run_task(&task, method, &path).await {
                error!(task = %task, %method, path = ?path, error = %err, "cascade failed");
            }
        });
    }
    debug!("change dispatcher finished");
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
