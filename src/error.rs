//! Errors.

use std::{io, time::Duration};

use thiserror::Error;

/// An error returned by the retrying HTTP transport.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// The request failed with an error which is not retried, or it was the only error seen.
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// More than one attempt failed with a connection error and the retries ran out.
    #[error("During retry attempts {} errors happened, last: {}", .errors.len(), last_error(.errors))]
    RetriesExhausted {
        /// The errors, in the order the attempts were made.
        errors: Vec<reqwest::Error>,
    },

    /// The API key cannot be sent as an `Authorization` header.
    ///
    /// Unrecoverable.
    #[error("The API key contains characters which are not allowed in a header")]
    InvalidApiKey,
}

impl HttpError {
    /// All the underlying request errors, oldest first.
    pub fn errors(&self) -> &[reqwest::Error] {
        match self {
            HttpError::Request(err) => std::slice::from_ref(err),
            HttpError::RetriesExhausted { errors } => errors,
            HttpError::InvalidApiKey => &[],
        }
    }
}

fn last_error(errors: &[reqwest::Error]) -> String {
    errors
        .last()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// An error while waiting for a [`Task`](crate::tasks::Task).
///
/// These are usage and scheduling errors, separate from anything the task itself returns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    /// The task did not complete within the wait timeout.
    #[error("Timed out waiting for the task execution after {0:?}")]
    Timeout(Duration),

    /// The loop which drives the task has stopped.
    ///
    /// Unrecoverable.
    #[error("Running loop is not alive")]
    LoopNotRunning,

    /// The task panicked.
    #[error("The task panicked")]
    Panicked,
}

/// An error while reading a ReportPortal response.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResponseError {
    /// The body could not be read.
    #[error("Unable to read the response body")]
    Body(#[source] reqwest::Error),

    /// The body is not valid JSON.
    #[error("Invalid response: {body}")]
    Json {
        /// The parsing error.
        #[source]
        source: serde_json::Error,
        /// The raw body.
        body: String,
    },
}

/// An error while constructing a client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// The HTTP client could not be built.
    #[error("Unable to build the HTTP client")]
    Http(#[from] HttpError),

    /// The loop or its thread could not be started.
    #[error("Unable to start the running loop")]
    Loop(#[from] io::Error),
}

/// Result type for HTTP operations.
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Result type for waiting on tasks.
pub type TaskResult<T> = std::result::Result<T, TaskError>;
