use std::{
    future::Future,
    io,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    config::TaskConfig,
    helpers::lock,
    tasks::{
        BackgroundTaskList, BatchedTaskFactory, BoxedTask, PendingTask, Task, ThreadedTaskFactory,
        TriggerTaskBatcher, POLL_INTERVAL,
    },
};

/// How a [`Reporter`](super::Reporter) runs async work and waits for it.
pub trait ExecutionStrategy: Send + Sync + 'static {
    /// Start the loop which runs tasks.
    fn start(config: TaskConfig) -> io::Result<Self>
    where
        Self: Sized;

    /// Schedule `future`, keeping track of it until it is drained by
    /// [`ExecutionStrategy::finish_tasks`].
    fn create_task<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Clone + Send + Sync + 'static;

    /// Wait for every tracked task, up to the shutdown timeout.
    fn finish_tasks(&self);

    /// The timeouts this strategy was created with.
    fn task_config(&self) -> TaskConfig;
}

/// Tasks run on a loop in a background thread, tracked in a [`BackgroundTaskList`].
#[derive(Debug)]
pub struct Threaded {
    factory: ThreadedTaskFactory,
    tasks: Arc<Mutex<BackgroundTaskList<BoxedTask>>>,
    config: TaskConfig,
}

impl Threaded {
    /// Start a background loop.
    pub fn new(config: TaskConfig) -> io::Result<Self> {
        Self::with_task_list(config, Arc::default())
    }

    /// Start a background loop, tracking tasks in a list which may be shared with others.
    pub fn with_task_list(
        config: TaskConfig,
        tasks: Arc<Mutex<BackgroundTaskList<BoxedTask>>>,
    ) -> io::Result<Self> {
        Ok(Self {
            factory: ThreadedTaskFactory::new(config.task_timeout)?,
            tasks,
            config,
        })
    }

    /// Whether the background loop is still running.
    pub fn is_running(&self) -> bool {
        self.factory.is_running()
    }
}

impl ExecutionStrategy for Threaded {
    fn start(config: TaskConfig) -> io::Result<Self> {
        Self::new(config)
    }

    fn create_task<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Clone + Send + Sync + 'static,
    {
        let task = self.factory.create_task(future);
        lock(&self.tasks).append(Box::new(task.clone()));
        task
    }

    fn finish_tasks(&self) {
        let Some(tasks) = lock(&self.tasks).flush() else {
            return;
        };
        let start = Instant::now();
        debug!(tasks = tasks.len(), "Waiting for background tasks");
        for task in tasks {
            // Bounded by the shutdown timeout, not by each task's wait timeout.
            while !task.is_done() && self.is_running() {
                if start.elapsed() >= self.config.shutdown_timeout {
                    warn!(
                        timeout = ?self.config.shutdown_timeout,
                        "Timed out waiting for background tasks"
                    );
                    return;
                }
                thread::sleep(POLL_INTERVAL);
            }
            if let Err(error) = task.wait() {
                warn!(%error, "Background task did not complete");
            }
        }
    }

    fn task_config(&self) -> TaskConfig {
        self.config
    }
}

/// Tasks run on a loop which only makes progress when a batch of them is driven to completion,
/// tracked in a [`TriggerTaskBatcher`].
#[derive(Debug)]
pub struct Batched {
    factory: BatchedTaskFactory,
    tasks: Arc<Mutex<TriggerTaskBatcher<BoxedTask>>>,
    config: TaskConfig,
}

impl Batched {
    /// Create a loop.
    pub fn new(config: TaskConfig) -> io::Result<Self> {
        let tasks = TriggerTaskBatcher::new(config.trigger_num, config.trigger_interval);
        Self::with_task_batcher(config, Arc::new(Mutex::new(tasks)))
    }

    /// Create a loop, accumulating tasks in a batcher which may be shared with others.
    pub fn with_task_batcher(
        config: TaskConfig,
        tasks: Arc<Mutex<TriggerTaskBatcher<BoxedTask>>>,
    ) -> io::Result<Self> {
        Ok(Self {
            factory: BatchedTaskFactory::new()?,
            tasks,
            config,
        })
    }

    /// Drive the loop until every task completes or the timeout elapses.
    fn run(&self, tasks: Vec<BoxedTask>, timeout: Duration) {
        debug!(tasks = tasks.len(), "Running a batch of tasks");
        let all = join_all(tasks.iter().map(|task| task.completion()));
        let completed = self
            .factory
            .block_on(async { tokio::time::timeout(timeout, all).await });
        if completed.is_err() {
            let pending = tasks.iter().filter(|task| !task.is_done()).count();
            warn!(pending, ?timeout, "Timed out waiting for a batch of tasks");
        }
    }
}

impl ExecutionStrategy for Batched {
    fn start(config: TaskConfig) -> io::Result<Self> {
        Self::new(config)
    }

    fn create_task<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Clone + Send + Sync + 'static,
    {
        let task = self.factory.create_task(future);
        let mut tasks = lock(&self.tasks);
        if let Some(batch) = tasks.append(Box::new(task.clone())) {
            self.run(batch, self.config.task_timeout);
        }
        task
    }

    fn finish_tasks(&self) {
        let mut tasks = lock(&self.tasks);
        if let Some(batch) = tasks.flush() {
            self.run(batch, self.config.shutdown_timeout);
        }
    }

    fn task_config(&self) -> TaskConfig {
        self.config
    }
}
