//! The active client of the current thread.
//!
//! Lets code which has no way to receive a client, like a helper deep inside a test, find the
//! one the test framework set up. Nothing in this crate reads it.

use std::{any::Any, cell::RefCell, sync::Arc};

thread_local! {
    static ACTIVE_CLIENT: RefCell<Option<Arc<dyn Any + Send + Sync>>> =
        const { RefCell::new(None) };
}

/// Make `client` the active client of the calling thread, replacing any previous one.
pub fn set_active_client<C>(client: Arc<C>)
where
    C: Any + Send + Sync,
{
    ACTIVE_CLIENT.with(|active| *active.borrow_mut() = Some(client));
}

/// The active client of the calling thread, if it is a `C`.
pub fn active_client<C>() -> Option<Arc<C>>
where
    C: Any + Send + Sync,
{
    ACTIVE_CLIENT
        .with(|active| active.borrow().clone())
        .and_then(|client| client.downcast::<C>().ok())
}

/// Forget the active client of the calling thread.
pub fn clear_active_client() {
    ACTIVE_CLIENT.with(|active| active.borrow_mut().take());
}
