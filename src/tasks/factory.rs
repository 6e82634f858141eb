use std::{
    future::Future,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use futures::FutureExt;
use tokio::{
    runtime::{Builder, Handle, Runtime},
    sync::oneshot,
};
use tracing::{debug, warn};

use crate::helpers::lock;

use super::task::{task_future, Task};

/// Name of the background thread which runs the threaded loop.
pub const LOOP_THREAD_NAME: &str = "rp-async-client";

/// Creates tasks on a loop which makes progress only while a thread blocks on it.
///
/// The loop is a current-thread runtime owned by the factory. Blocking on any task, or calling
/// [`BatchedTaskFactory::block_on`], runs every task spawned so far.
///
/// Dropping the factory from within an async context panics.
#[derive(Debug)]
pub struct BatchedTaskFactory {
    runtime: Arc<Runtime>,
}

impl BatchedTaskFactory {
    /// Create a factory with its own loop.
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Schedule `future` on the loop.
    pub fn create_task<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Clone + Send + Sync + 'static,
    {
        let future = task_future(future);
        // Detached: the task is polled whenever the loop runs, even if nobody waits on it.
        drop(self.runtime.spawn(future.clone().map(drop)));
        Task::batched(future, Arc::downgrade(&self.runtime))
    }

    /// Run the loop on the calling thread until `future` completes.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Creates tasks on a loop which runs on a dedicated background thread.
///
/// The thread is stopped and joined when the factory is dropped or shut down.
#[derive(Debug)]
pub struct ThreadedTaskFactory {
    handle: Handle,
    wait_timeout: Duration,
    alive: Arc<AtomicBool>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadedTaskFactory {
    /// Start the background loop. Tasks created by this factory wait at most `wait_timeout` in
    /// [`Task::blocking_result`].
    pub fn new(wait_timeout: Duration) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let alive = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_owned())
            .spawn({
                let alive = Arc::clone(&alive);
                move || {
                    // Spawned tasks are polled while this thread blocks.
                    let _ = runtime.block_on(shutdown_rx);
                    alive.store(false, Ordering::Release);
                    debug!("Background loop stopped");
                }
            })?;

        Ok(Self {
            handle,
            wait_timeout,
            alive,
            shutdown: Mutex::new(Some(shutdown_tx)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Schedule `future` on the background loop.
    pub fn create_task<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Clone + Send + Sync + 'static,
    {
        let future = task_future(future);
        if self.is_running() {
            drop(self.handle.spawn(future.clone().map(drop)));
        } else {
            warn!("Creating a task after the background loop stopped");
        }
        Task::threaded(future, Arc::clone(&self.alive), self.wait_timeout)
    }

    /// Whether the background loop is still running.
    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Stop the background loop and wait for its thread to exit.
    ///
    /// Tasks which have not completed will never complete.
    pub fn shut_down(&self) {
        if let Some(shutdown) = lock(&self.shutdown).take() {
            let _ = shutdown.send(());
        }
        let Some(thread) = lock(&self.thread).take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            // Called from a task on the loop itself; it exits once the task yields.
            return;
        }
        if thread.join().is_err() {
            warn!("Background loop thread panicked");
        }
    }
}

impl Drop for ThreadedTaskFactory {
    fn drop(&mut self) {
        self.shut_down();
    }
}
