// src/engine/mod.rs

//! Orchestration engine for bistro.
//!
//! This module ties together:
//! - the per-task in-flight tracker ([`queue`])
//! - reactions and the values handed to them ([`reaction`])
//! - the per-task watch/execute state machine ([`task`])
//! - the orchestrator that drives startup and cascades ([`bistro`])
//!
//! Components talk through typed events: the watch backend feeds
//! `WatchEvent`s into a task, a task forwards [`ChangeEvent`]s to the
//! orchestrator and publishes [`TaskEvent`]s to observers.

use std::path::PathBuf;

use crate::types::Method;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// A file relevant to a task was created, modified or removed after the
/// task's startup scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub task: TaskName,
    pub method: Method,
    pub path: PathBuf,
}

/// Lifecycle notifications published by a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// The startup scan completed and in-flight work drained.
    Ready,
    /// A reaction finished successfully.
    Done { method: Method, path: PathBuf },
}

pub mod bistro;
pub mod queue;
pub mod reaction;
pub mod task;

pub use bistro::Bistro;
pub use queue::ChangeQueue;
pub use reaction::{Invocation, Reaction, ReactionContext, ReactionFuture};
pub use task::{Task, TaskEnv, TaskState};
