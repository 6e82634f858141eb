//! Tasks for driving async work from synchronous code.
//!
//! A [`Task`] is created by a factory which decides what drives it: a loop on a background
//! thread ([`ThreadedTaskFactory`]) or a loop which only runs while the caller blocks on it
//! ([`BatchedTaskFactory`]). Containers keep track of outstanding tasks so they can be drained
//! when reporting finishes.

mod batcher;
mod factory;
mod list;
mod task;

use std::{fmt, time::Duration};

use futures::future::{BoxFuture, FutureExt};

use crate::error::TaskError;

pub use batcher::{TriggerTaskBatcher, DEFAULT_TASK_TRIGGER_INTERVAL, DEFAULT_TASK_TRIGGER_NUM};
pub use factory::{BatchedTaskFactory, ThreadedTaskFactory, LOOP_THREAD_NAME};
pub use list::BackgroundTaskList;
pub use task::{Task, TaskFuture, POLL_INTERVAL};

/// Default time to wait for a single task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);
/// Default time to wait for all outstanding tasks when finishing.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(120);

/// A task whose output is not needed, only its completion.
///
/// Lets task containers hold tasks of different output types.
pub trait PendingTask: Send + Sync {
    /// Whether the work has completed.
    fn is_done(&self) -> bool;

    /// Block until the work completes.
    fn wait(&self) -> Result<(), TaskError>;

    /// A future which resolves when the work completes.
    fn completion(&self) -> BoxFuture<'static, ()>;
}

impl fmt::Debug for dyn PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask")
            .field("done", &self.is_done())
            .finish()
    }
}

impl<T> PendingTask for Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn is_done(&self) -> bool {
        Task::is_done(self)
    }

    fn wait(&self) -> Result<(), TaskError> {
        self.blocking_result().map(drop)
    }

    fn completion(&self) -> BoxFuture<'static, ()> {
        self.future().map(drop).boxed()
    }
}

impl<P> PendingTask for Box<P>
where
    P: PendingTask + ?Sized,
{
    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn wait(&self) -> Result<(), TaskError> {
        (**self).wait()
    }

    fn completion(&self) -> BoxFuture<'static, ()> {
        (**self).completion()
    }
}

/// A type-erased task.
pub type BoxedTask = Box<dyn PendingTask>;
