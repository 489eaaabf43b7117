//! Scoped ownership of an open store.

use std::ops::Deref;

use tracing::{debug, warn};

use crate::infrastructure::error::StoreResult;
use crate::infrastructure::traits::HierarchicalStore;

/// Owns an open store and closes it exactly once.
///
/// `close` releases the store and reports the result. A guard dropped
/// without `close` (early return on error, panic) releases it in `Drop`,
/// logging a failed close instead of raising it.
pub struct StoreGuard<S: HierarchicalStore> {
    store: S,
    closed: bool,
}

impl<S: HierarchicalStore> StoreGuard<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            closed: false,
        }
    }

    /// Close the store, surfacing any error.
    pub fn close(mut self) -> StoreResult<()> {
        self.closed = true;
        debug!("closing store");
        self.store.close()
    }
}

impl<S: HierarchicalStore> Deref for StoreGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S: HierarchicalStore> Drop for StoreGuard<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!("closing store on drop");
        if let Err(e) = self.store.close() {
            warn!("failed to close store: {}", e);
        }
    }
}
