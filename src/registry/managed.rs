use std::ops::Deref;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};

use crate::store::Endpoint;

// -----------------------------------------------------------------------------
// ----- Slot ------------------------------------------------------------------

/// One session's cell in the registry table. Writers (connect, disconnect,
/// heal) are serialized per session; leases hold it for reading.
pub(crate) type Slot<C> = RwLock<Option<ManagedConnection<C>>>;

// -----------------------------------------------------------------------------
// ----- ManagedConnection -----------------------------------------------------

/// The registry's record pairing an endpoint with the client opened for it.
/// The endpoint never changes; a new endpoint means a new record.
#[derive(Debug)]
pub struct ManagedConnection<C> {
    endpoint: Endpoint,
    client: C,
}

impl<C> ManagedConnection<C> {
    pub(crate) fn new(endpoint: Endpoint, client: C) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionLease -------------------------------------------------------

/// A borrowed, ready connection. Holding it keeps the session's slot
/// read-locked, so the connection cannot be closed or replaced underneath the
/// caller. Drop it as soon as the operation is done.
pub struct ConnectionLease<C> {
    guard: OwnedRwLockReadGuard<Option<ManagedConnection<C>>, ManagedConnection<C>>,
}

impl<C> ConnectionLease<C> {
    /// `None` when the slot is empty.
    pub(crate) fn new(guard: OwnedRwLockReadGuard<Option<ManagedConnection<C>>>) -> Option<Self> {
        OwnedRwLockReadGuard::try_map(guard, Option::as_ref)
            .ok()
            .map(|guard| Self { guard })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.guard.endpoint()
    }

    pub fn client(&self) -> &C {
        self.guard.client()
    }
}

impl<C> Deref for ConnectionLease<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.guard.client()
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
