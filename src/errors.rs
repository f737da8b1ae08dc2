// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::TaskName;

/// Boxed underlying cause carried by reaction and watch failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum BistroError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task '{task}' failed on {path:?}: {source}")]
    Reaction {
        task: TaskName,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Could not watch '{pattern}' for task '{task}': {source}")]
    WatchSetup {
        task: TaskName,
        pattern: String,
        #[source]
        source: BoxError,
    },

    #[error("Task '{0}' has been stopped")]
    TaskStopped(TaskName),

    #[error("Orchestrator already started")]
    AlreadyStarted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BistroError>;
