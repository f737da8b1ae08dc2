// src/config/model.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::engine::reaction::{self, Reaction, ReactionContext};
use crate::engine::TaskName;
use crate::exec::ShellReaction;
use crate::types::FinishEvent;

/// Callback invoked after every cascade and once after startup.
pub type FinishCallback = Arc<dyn Fn(&FinishEvent) + Send + Sync>;

/// Programmatic configuration of one task.
///
/// ```
/// use bistro::config::TaskConfig;
///
/// let styles = TaskConfig::new("styles/*.css")
///     .read(true)
///     .run(["pages"])
///     .on_update(|inv: bistro::engine::Invocation| async move {
///         println!("{} changed", inv.name);
///         anyhow::Ok(())
///     });
/// assert_eq!(styles.run, vec!["pages".to_string()]);
/// ```
#[derive(Clone)]
pub struct TaskConfig {
    /// Glob relative to the base directory.
    pub pattern: String,
    /// Read file contents before calling `update`.
    pub read: bool,
    /// Tasks that re-run after this one.
    pub run: Vec<TaskName>,
    pub update: Arc<dyn Reaction>,
    pub remove: Arc<dyn Reaction>,
    pub context: ReactionContext,
}

impl fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConfig")
            .field("pattern", &self.pattern)
            .field("read", &self.read)
            .field("run", &self.run)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl TaskConfig {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            read: false,
            run: Vec::new(),
            update: reaction::noop(),
            remove: reaction::noop(),
            context: ReactionContext::default(),
        }
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn run<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.run = tasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn on_update(mut self, reaction: impl Reaction + 'static) -> Self {
        self.update = Arc::new(reaction);
        self
    }

    pub fn on_remove(mut self, reaction: impl Reaction + 'static) -> Self {
        self.remove = Arc::new(reaction);
        self
    }

    pub fn context(mut self, context: ReactionContext) -> Self {
        self.context = context;
        self
    }
}

/// Tasks keyed by unique name, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<(TaskName, TaskConfig)>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task. An existing task of the same name is replaced in place
    /// and returned.
    pub fn insert(&mut self, name: impl Into<TaskName>, config: TaskConfig) -> Option<TaskConfig> {
        let name = name.into();
        match self.tasks.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, config)),
            None => {
                self.tasks.push((name, config));
                None
            }
        }
    }

    pub fn with(mut self, name: impl Into<TaskName>, config: TaskConfig) -> Self {
        self.insert(name, config);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskConfig)> {
        self.tasks.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(n, _)| n.as_str())
    }
}

impl<N: Into<TaskName>> FromIterator<(N, TaskConfig)> for TaskSet {
    fn from_iter<T: IntoIterator<Item = (N, TaskConfig)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, config) in iter {
            set.insert(name, config);
        }
        set
    }
}

/// Orchestrator options.
#[derive(Clone, Default)]
pub struct BistroOptions {
    /// Directory patterns are relative to. Defaults to the working directory;
    /// relative paths are resolved against it.
    pub base_dir: Option<PathBuf>,
    pub on_task_finish: Option<FinishCallback>,
    /// Emit the progress trace at `info`.
    pub verbose: bool,
}

impl fmt::Debug for BistroOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BistroOptions")
            .field("base_dir", &self.base_dir)
            .field("on_task_finish", &self.on_task_finish.is_some())
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl BistroOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn on_task_finish(mut self, callback: impl Fn(&FinishEvent) + Send + Sync + 'static) -> Self {
        self.on_task_finish = Some(Arc::new(callback));
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Configuration file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// base_dir = "site"
/// verbose = true
///
/// [task.styles]
/// pattern = "styles/*.css"
/// run = ["pages"]
/// update = "cp \"$BISTRO_FILE\" out/"
/// ```
///
/// Tasks stay a raw table here so their file order survives; validation
/// turns them into [`FileTaskConfig`]s.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub task: toml::Table,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Base directory for every pattern, relative to the config file's
    /// directory. Defaults to that directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    #[serde(default)]
    pub verbose: bool,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FileTaskConfig {
    pub pattern: String,

    #[serde(default)]
    pub read: bool,

    #[serde(default)]
    pub run: Vec<String>,

    /// Shell command run for created and changed files.
    #[serde(default)]
    pub update: Option<String>,

    /// Shell command run for removed files.
    #[serde(default)]
    pub remove: Option<String>,
}

/// A validated configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    tasks: Vec<(TaskName, FileTaskConfig)>,
}

impl ConfigFile {
    /// Build without validation. Use [`crate::config::load_and_validate`] or
    /// `ConfigFile::try_from(raw)` instead.
    pub(crate) fn new_unchecked(config: ConfigSection, tasks: Vec<(TaskName, FileTaskConfig)>) -> Self {
        Self { config, tasks }
    }

    /// Tasks in file order.
    pub fn tasks(&self) -> &[(TaskName, FileTaskConfig)] {
        &self.tasks
    }

    /// Convert into a [`TaskSet`] whose reactions run shell commands in
    /// `workdir`.
    pub fn task_set(&self, workdir: &Path) -> TaskSet {
        self.tasks
            .iter()
            .map(|(name, task)| {
                let mut config = TaskConfig::new(task.pattern.clone())
                    .read(task.read)
                    .run(task.run.iter().cloned());
                if let Some(cmd) = &task.update {
                    config = config.on_update(ShellReaction::new(cmd.clone(), workdir));
                }
                if let Some(cmd) = &task.remove {
                    config = config.on_remove(ShellReaction::new(cmd.clone(), workdir));
                }
                (name.clone(), config)
            })
            .collect()
    }
}
