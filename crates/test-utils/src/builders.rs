use bistro::{TaskConfig, TaskSet};

use crate::Recorder;

/// Builder for `TaskSet` to simplify test setup.
#[derive(Debug, Default)]
pub struct TaskSetBuilder {
    tasks: TaskSet,
}

impl TaskSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.tasks.insert(name, task);
        self
    }

    /// A task whose `update` and `remove` both record into `recorder`.
    pub fn recorded(self, name: &str, pattern: &str, run: &[&str], recorder: &Recorder) -> Self {
        let task = TaskConfig::new(pattern)
            .run(run.iter().copied())
            .on_update(recorder.reaction())
            .on_remove(recorder.reaction());
        self.with_task(name, task)
    }

    /// Recorded tasks where each one runs the next: `names[0] -> names[1] -> ...`.
    pub fn chain(mut self, names: &[&str], pattern: &str, recorder: &Recorder) -> Self {
        for (i, name) in names.iter().enumerate() {
            let run: Vec<&str> = names.get(i + 1).into_iter().copied().collect();
            self = self.recorded(name, pattern, &run, recorder);
        }
        self
    }

    pub fn build(self) -> TaskSet {
        self.tasks
    }
}
