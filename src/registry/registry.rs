use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::managed::{ConnectionLease, ManagedConnection, Slot};
use super::readiness::{Readiness, heal};
use crate::errors::DashboardError;
use crate::store::{Connector, Endpoint, StoreClient};

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry ----------------------------------------------------

/// Session id → managed store connection, at most one per session.
///
/// The table lock only guards lookups and inserts. All I/O for a session
/// happens under that session's own slot lock, so unrelated sessions never
/// wait on each other.
pub struct ConnectionRegistry<K: Connector> {
    connector: K,
    sessions: Mutex<HashMap<String, Arc<Slot<K::Client>>>>,
}

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Static --------------------------------------------

impl<K: Connector> ConnectionRegistry<K> {
    pub fn new(connector: K) -> Self {
        Self {
            connector,
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Public --------------------------------------------

impl<K: Connector> ConnectionRegistry<K> {
    /// A ready connection for `session_id`, healing it first if needed.
    ///
    /// `None` means there is no usable connection: no session, never
    /// connected, or the heal attempt failed. The entry survives a failed
    /// heal so a later call can try again.
    pub async fn acquire(&self, session_id: &str) -> Option<ConnectionLease<K::Client>> {
        if session_id.is_empty() {
            return None;
        }

        let slot = self.slot(session_id)?;

        let entry = slot.clone().read_owned().await;
        match entry.as_ref().map(|m| Readiness::of(m.client())) {
            Some(Readiness::Ready) => return ConnectionLease::new(entry),
            Some(_) => drop(entry),
            None => {
                // A disconnect emptied the slot while we waited on it.
                drop(entry);
                self.prune(session_id, slot);
                return None;
            }
        }

        let entry = slot.clone().write_owned().await;
        let Some(managed) = entry.as_ref() else {
            drop(entry);
            self.prune(session_id, slot);
            return None;
        };

        // Someone else may have healed it while we waited for the lock.
        if let Err(e) = heal(managed.client()).await {
            warn!("failed to heal store connection for session {session_id}: {e}");
            return None;
        }

        ConnectionLease::new(entry.downgrade())
    }

    pub async fn connect(&self, session_id: &str, endpoint: &str) -> Result<(), DashboardError> {
        if session_id.is_empty() {
            return Err(DashboardError::MissingSession);
        }

        let endpoint = Endpoint::new(endpoint);
        if endpoint.is_blank() {
            return Err(DashboardError::MissingEndpoint);
        }

        let slot = self.slot_or_insert(session_id);
        let result = self.connect_slot(&slot, session_id, endpoint).await;
        self.prune(session_id, slot);

        result
    }

    pub async fn disconnect(&self, session_id: &str) {
        if session_id.is_empty() {
            return;
        }

        let Some(slot) = self.slot(session_id) else {
            return;
        };

        {
            let mut entry = slot.write().await;
            if let Some(old) = entry.take() {
                close(session_id, old.client()).await;
                info!("session {session_id} disconnected from {}", old.endpoint().redacted());
            }
        }

        self.prune(session_id, slot);
    }

    /// Close every session. Called once on the way out.
    pub async fn shutdown(&self) {
        let session_ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        if !session_ids.is_empty() {
            info!("closing {} store session(s)", session_ids.len());
        }

        for session_id in session_ids {
            self.disconnect(&session_id).await;
        }
    }

    /// Sessions currently holding a managed connection.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionRegistry: Private -------------------------------------------

impl<K: Connector> ConnectionRegistry<K> {
    fn slot(&self, session_id: &str) -> Option<Arc<Slot<K::Client>>> {
        self.sessions.lock().get(session_id).cloned()
    }

    fn slot_or_insert(&self, session_id: &str) -> Arc<Slot<K::Client>> {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    async fn connect_slot(
        &self,
        slot: &Slot<K::Client>,
        session_id: &str,
        endpoint: Endpoint,
    ) -> Result<(), DashboardError> {
        let mut entry = slot.write().await;

        if let Some(existing) = entry.as_ref() {
            if existing.endpoint() == &endpoint {
                let client = existing.client();
                if client.is_open() || client.is_ready() {
                    debug!("session {session_id} already connected");
                    return Ok(());
                }

                client.open().await.map_err(DashboardError::Connect)?;
                info!("session {session_id} reconnected to {}", endpoint.redacted());
                return Ok(());
            }
        }

        if let Some(old) = entry.take() {
            info!(
                "session {session_id} switching store {} -> {}",
                old.endpoint().redacted(),
                endpoint.redacted()
            );
            close(session_id, old.client()).await;
        }

        let client = self.connector.client(session_id, &endpoint);
        client.open().await.map_err(DashboardError::Connect)?;

        info!("session {session_id} connected to {}", endpoint.redacted());
        *entry = Some(ManagedConnection::new(endpoint, client));

        Ok(())
    }

    /// Drop an empty slot from the table, but only if nobody else holds it.
    /// A concurrent connect that already cloned the slot keeps it alive.
    fn prune(&self, session_id: &str, slot: Arc<Slot<K::Client>>) {
        let mut sessions = self.sessions.lock();

        let Some(current) = sessions.get(session_id) else {
            return;
        };
        if !Arc::ptr_eq(current, &slot) {
            return;
        }

        // One reference in the table, one here.
        if Arc::strong_count(&slot) != 2 {
            return;
        }

        if slot.try_read().is_ok_and(|entry| entry.is_none()) {
            sessions.remove(session_id);
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

/// Orderly shutdown first; if that fails, force the transport down. Errors on
/// the fallback path are dropped: the goal is releasing the connection.
async fn close<C: StoreClient>(session_id: &str, client: &C) {
    if !client.is_open() {
        return;
    }

    if let Err(e) = client.quit().await {
        debug!("graceful close failed for session {session_id}, terminating: {e}");
        client.terminate();
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
