use std::fmt;

use tracing::warn;

use crate::tasks::{Task, TaskFuture};

/// An identifier which may not be known yet.
///
/// Ids returned by the server arrive asynchronously. Requests referring to them can be built
/// straight away and resolve the id only when they are sent.
#[derive(Clone)]
pub enum IdRef {
    /// A known id.
    Ready(String),
    /// The output of a task which returns the id, or `None` if the request failed.
    Pending(TaskFuture<Option<String>>),
}

impl IdRef {
    /// Wait for the id.
    pub async fn resolve(&self) -> Option<String> {
        match self {
            IdRef::Ready(id) => Some(id.clone()),
            IdRef::Pending(future) => match future.clone().await {
                Ok(id) => id,
                Err(error) => {
                    warn!(%error, "Unable to resolve an id");
                    None
                }
            },
        }
    }

    /// The id, if it is already known. Never waits.
    pub fn peek(&self) -> Option<String> {
        match self {
            IdRef::Ready(id) => Some(id.clone()),
            IdRef::Pending(future) => future.peek().cloned()?.ok().flatten(),
        }
    }
}

impl fmt::Debug for IdRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdRef::Ready(id) => f.debug_tuple("Ready").field(id).finish(),
            IdRef::Pending(future) => f.debug_tuple("Pending").field(&future.peek()).finish(),
        }
    }
}

impl From<String> for IdRef {
    fn from(id: String) -> Self {
        IdRef::Ready(id)
    }
}

impl From<&str> for IdRef {
    fn from(id: &str) -> Self {
        IdRef::Ready(id.to_owned())
    }
}

impl From<&Task<Option<String>>> for IdRef {
    fn from(task: &Task<Option<String>>) -> Self {
        IdRef::Pending(task.future())
    }
}

impl From<Task<Option<String>>> for IdRef {
    fn from(task: Task<Option<String>>) -> Self {
        IdRef::Pending(task.future())
    }
}
