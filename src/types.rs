// src/types.rs

//! Shared types used across modules.

use std::fmt;
use std::path::PathBuf;

use crate::engine::TaskName;

/// Which reaction of a task a file event is routed to.
///
/// - `Update`: the file was added or changed (also used for full re-runs).
/// - `Remove`: the file was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Update,
    Remove,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Update => "update",
            Method::Remove => "remove",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification delivered to `on_task_finish` when a cascade (or the whole
/// startup pass) has completed.
///
/// `task_name`, `method` and `file_name` are `None` only for the bulk event
/// emitted once after startup; in that case `dependencies` lists every task in
/// startup order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishEvent {
    pub task_name: Option<TaskName>,
    pub method: Option<Method>,
    pub dependencies: Vec<TaskName>,
    pub file_name: Option<PathBuf>,
}

impl FinishEvent {
    /// The bulk event emitted once every task has finished its startup pass.
    pub fn bulk(order: Vec<TaskName>) -> Self {
        Self {
            task_name: None,
            method: None,
            dependencies: order,
            file_name: None,
        }
    }

    pub fn is_bulk(&self) -> bool {
        self.task_name.is_none()
    }
}
