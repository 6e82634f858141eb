use std::{
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll},
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use tokio::runtime::Runtime;
use tracing::warn;

use crate::error::{TaskError, TaskResult};

/// How often a threaded task is checked while waiting for it.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The shared, cloneable output of a task.
pub type TaskFuture<T> = Shared<BoxFuture<'static, TaskResult<T>>>;

/// A handle to one unit of asynchronous work, with a blocking way to get its result.
///
/// Cloning a task gives another handle to the same work. Once the work completes its result is
/// cached, and [`Task::blocking_result`] returns it on every call without waiting again.
///
/// A task also implements [`Future`], so async code can `.await` it directly.
pub struct Task<T> {
    future: TaskFuture<T>,
    driver: Driver,
}

#[derive(Clone)]
enum Driver {
    /// Driven by a loop which only runs while some thread blocks on it.
    Batched {
        runtime: Weak<Runtime>,
        owner: ThreadId,
    },
    /// Driven by a loop on a background thread.
    Threaded {
        loop_alive: Arc<AtomicBool>,
        wait_timeout: Duration,
    },
}

pub(crate) fn task_future<F>(future: F) -> TaskFuture<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Clone + Send + Sync + 'static,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .map(|result| result.map_err(|_panic| TaskError::Panicked))
        .boxed()
        .shared()
}

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn batched(future: TaskFuture<T>, runtime: Weak<Runtime>) -> Self {
        Self {
            future,
            driver: Driver::Batched {
                runtime,
                owner: thread::current().id(),
            },
        }
    }

    pub(crate) fn threaded(
        future: TaskFuture<T>,
        loop_alive: Arc<AtomicBool>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            future,
            driver: Driver::Threaded {
                loop_alive,
                wait_timeout,
            },
        }
    }

    /// Whether the work has completed.
    pub fn is_done(&self) -> bool {
        self.future.peek().is_some()
    }

    /// The result, if the work has completed. Never waits.
    pub fn result(&self) -> Option<TaskResult<T>> {
        self.future.peek().cloned()
    }

    /// A future resolving to the result, usable from async code.
    pub fn future(&self) -> TaskFuture<T> {
        self.future.clone()
    }

    /// Block the calling thread until the result is available.
    ///
    /// A batched task drives its loop on the calling thread until the work completes. A
    /// threaded task polls every [`POLL_INTERVAL`] and gives up with [`TaskError::Timeout`]
    /// after its wait timeout.
    ///
    /// # Panics
    ///
    /// A batched task panics when called from within an async context.
    pub fn blocking_result(&self) -> TaskResult<T> {
        if let Some(result) = self.future.peek() {
            return result.clone();
        }

        match &self.driver {
            Driver::Batched { runtime, owner } => {
                if thread::current().id() != *owner {
                    warn!(
                        owner = ?owner,
                        "Waiting for a batched task from a thread which did not create it"
                    );
                }
                let runtime = runtime.upgrade().ok_or(TaskError::LoopNotRunning)?;
                runtime.block_on(self.future.clone())
            }
            Driver::Threaded {
                loop_alive,
                wait_timeout,
            } => {
                let start = Instant::now();
                loop {
                    if let Some(result) = self.future.peek() {
                        return result.clone();
                    }
                    if !loop_alive.load(Ordering::Acquire) {
                        return Err(TaskError::LoopNotRunning);
                    }
                    if start.elapsed() >= *wait_timeout {
                        return Err(TaskError::Timeout(*wait_timeout));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            driver: self.driver.clone(),
        }
    }
}

impl<T> Future for Task<T>
where
    T: Clone,
{
    type Output = TaskResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.future).poll(cx)
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.driver {
            Driver::Batched { .. } => "batched",
            Driver::Threaded { .. } => "threaded",
        };
        f.debug_struct("Task")
            .field("mode", &mode)
            .field("done", &self.future.peek().is_some())
            .finish()
    }
}
