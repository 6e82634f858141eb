//! Clients for the ReportPortal API.
//!
//! - [`AsyncClient`]: stateless, every operation is an `async fn`.
//! - [`Reporter`]: synchronous calls returning [`Task`](crate::tasks::Task)s, keeping track of
//!   the launch and the current item. Runs either on a background thread ([`Threaded`]) or in
//!   batches on the calling thread ([`Batched`]).
//! - [`BlockingClient`]: synchronous calls which block until the request completes.

mod api;
mod blocking;
mod reporter;
mod strategy;
mod urls;

pub use api::AsyncClient;
pub use blocking::BlockingClient;
pub use reporter::{BatchedReporter, Reporter, ReporterState, ThreadedReporter};
pub use strategy::{Batched, ExecutionStrategy, Threaded};
