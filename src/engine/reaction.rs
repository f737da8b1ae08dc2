// src/engine/reaction.rs

//! Reaction callbacks bound to a task's `update` / `remove` methods.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use super::TaskName;
use crate::types::Method;

/// Boxed future returned by every reaction.
pub type ReactionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Opaque user value handed to every reaction of a task.
///
/// Reactions recover the concrete type with [`ReactionContext::get`].
#[derive(Clone, Default)]
pub struct ReactionContext(Option<Arc<dyn Any + Send + Sync>>);

impl ReactionContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the context as `T`, or `None` if it is empty or of another type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for ReactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ReactionContext(..)"),
            None => f.write_str("ReactionContext(empty)"),
        }
    }
}

/// Everything a reaction learns about the file it is called for.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub task: TaskName,
    pub method: Method,
    /// File name without its last extension.
    pub name: String,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File contents, present only for `update` on tasks with `read = true`.
    pub contents: Option<String>,
    pub context: ReactionContext,
}

/// A task's `update` or `remove` callback.
pub trait Reaction: Send + Sync {
    fn call(&self, invocation: Invocation) -> ReactionFuture;
}

impl<F, Fut> Reaction for F
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, invocation: Invocation) -> ReactionFuture {
        Box::pin(self(invocation))
    }
}

/// Reaction that does nothing; the default for unset methods.
pub fn noop() -> Arc<dyn Reaction> {
    Arc::new(|_inv: Invocation| async { anyhow::Ok(()) })
}
