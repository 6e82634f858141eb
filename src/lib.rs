//! Report test launches, items and logs to [ReportPortal](https://reportportal.io).
//!
//! Reporting should never slow tests down much, or fail them. Requests are retried with
//! backoff when the server is throttling or briefly unavailable, log entries are sent in
//! batches, and failures are logged rather than returned.
//!
//! Three clients cover different callers:
//!
//! - [`AsyncClient`] for async code.
//! - [`Reporter`] for synchronous code which should not wait for each request. Each call returns
//!   a [`Task`](tasks::Task) straight away; ids returned by earlier calls can be passed to later
//!   ones before they are known.
//! - [`BlockingClient`] for synchronous code which is happy to wait.
//!
//! See the README for an example.

#![warn(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod helpers;
pub mod http;
pub mod logs;
pub mod model;
pub mod tasks;

pub use client::{
    AsyncClient, Batched, BatchedReporter, BlockingClient, ExecutionStrategy, Reporter,
    ReporterState, Threaded, ThreadedReporter,
};
pub use config::{ClientConfig, TaskConfig};
pub use error::{ClientError, HttpError, TaskError};
pub use logs::{LogLevel, RpFile};
pub use model::{
    Attribute, IdRef, Issue, ItemFinishRequest, ItemStartRequest, LaunchFinishRequest,
    LaunchStartRequest,
};
