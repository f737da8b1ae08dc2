use std::future::{ready, Ready};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bistro::engine::Invocation;
use bistro::{FinishEvent, Method};
use tokio::sync::mpsc;

/// One reaction call as seen by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub task: String,
    pub method: Method,
    pub name: String,
    pub path: PathBuf,
    pub contents: Option<String>,
}

/// Shared log of reaction calls, in the order the reactions were invoked.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A reaction that records its invocation and succeeds.
    pub fn reaction(
        &self,
    ) -> impl Fn(Invocation) -> Ready<anyhow::Result<()>> + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        move |inv: Invocation| {
            calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(RecordedCall {
                    task: inv.task,
                    method: inv.method,
                    name: inv.name,
                    path: inv.path,
                    contents: inv.contents,
                });
            ready(Ok(()))
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    /// Task names in call order.
    pub fn tasks(&self) -> Vec<String> {
        self.lock().iter().map(|c| c.task.clone()).collect()
    }

    pub fn calls_for(&self, task: &str) -> Vec<RecordedCall> {
        self.lock().iter().filter(|c| c.task == task).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A reaction that always fails with `message`.
pub fn failing(
    message: &'static str,
) -> impl Fn(Invocation) -> Ready<anyhow::Result<()>> + Send + Sync + 'static {
    move |_inv: Invocation| ready(Err(anyhow::anyhow!(message)))
}

/// Collects finish events delivered to `on_task_finish`.
#[derive(Debug, Clone)]
pub struct FinishLog {
    tx: mpsc::UnboundedSender<FinishEvent>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<FinishEvent>>>,
    seen: Arc<Mutex<Vec<FinishEvent>>>,
}

impl Default for FinishLog {
    fn default() -> Self {
        Self::new()
    }
}

impl FinishLog {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Callback to install as `on_task_finish`.
    pub fn callback(&self) -> impl Fn(&FinishEvent) + Send + Sync + 'static {
        let tx = self.tx.clone();
        let seen = Arc::clone(&self.seen);
        move |event: &FinishEvent| {
            seen.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            let _ = tx.send(event.clone());
        }
    }

    /// Wait for the next finish event (5 s timeout).
    pub async fn next(&self) -> FinishEvent {
        crate::with_timeout(async {
            self.rx
                .lock()
                .await
                .recv()
                .await
                .expect("finish log channel closed")
        })
        .await
    }

    /// Every event received so far.
    pub fn events(&self) -> Vec<FinishEvent> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
