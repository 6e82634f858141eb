use std::{mem, time::Duration};

use tokio::time::Instant;

/// Number of tasks which triggers a run.
pub const DEFAULT_TASK_TRIGGER_NUM: usize = 10;
/// Time since the last run which triggers a run.
pub const DEFAULT_TASK_TRIGGER_INTERVAL: Duration = Duration::from_secs(1);

/// Accumulates tasks and hands them back once enough have built up or enough time has passed.
///
/// Used when the loop only runs on demand: the returned batch is what the caller should drive
/// to completion.
#[derive(Debug)]
pub struct TriggerTaskBatcher<T> {
    tasks: Vec<T>,
    last_run: Instant,
    trigger_num: usize,
    trigger_interval: Duration,
}

impl<T> TriggerTaskBatcher<T> {
    /// Create a batcher which triggers at `trigger_num` tasks, or `trigger_interval` after the
    /// last trigger, whichever comes first.
    pub fn new(trigger_num: usize, trigger_interval: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            last_run: Instant::now(),
            trigger_num,
            trigger_interval,
        }
    }

    fn ready_to_run(&mut self) -> bool {
        if self.tasks.is_empty() {
            return false;
        }
        let now = Instant::now();
        if self.tasks.len() >= self.trigger_num
            || now.duration_since(self.last_run) >= self.trigger_interval
        {
            self.last_run = now;
            return true;
        }
        false
    }

    /// Add a task. Returns every accumulated task, including this one, when a trigger fires.
    pub fn append(&mut self, task: T) -> Option<Vec<T>> {
        self.tasks.push(task);
        self.ready_to_run().then(|| mem::take(&mut self.tasks))
    }

    /// Return and clear all accumulated tasks, if any.
    pub fn flush(&mut self) -> Option<Vec<T>> {
        (!self.tasks.is_empty()).then(|| mem::take(&mut self.tasks))
    }

    /// Number of accumulated tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are accumulated.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T> Default for TriggerTaskBatcher<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_TRIGGER_NUM, DEFAULT_TASK_TRIGGER_INTERVAL)
    }
}
