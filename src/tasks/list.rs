use std::mem;

use super::PendingTask;

/// Keeps track of tasks running in the background, forgetting them as they complete.
///
/// Pruning is conservative: only the leading run of completed tasks is dropped, so a completed
/// task behind a pending one stays until the pending one completes.
#[derive(Debug)]
pub struct BackgroundTaskList<T> {
    tasks: Vec<T>,
}

impl<T: PendingTask> BackgroundTaskList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    fn remove_finished(&mut self) {
        let finished = self
            .tasks
            .iter()
            .position(|task| !task.is_done())
            .unwrap_or(self.tasks.len());
        self.tasks.drain(..finished);
    }

    /// Add a task, first dropping the leading completed ones.
    pub fn append(&mut self, task: T) {
        self.remove_finished();
        self.tasks.push(task);
    }

    /// Return and clear every tracked task, completed or not.
    pub fn flush(&mut self) -> Option<Vec<T>> {
        (!self.tasks.is_empty()).then(|| mem::take(&mut self.tasks))
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are tracked.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T: PendingTask> Default for BackgroundTaskList<T> {
    fn default() -> Self {
        Self::new()
    }
}
