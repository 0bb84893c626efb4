use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::http::connection::ConnectionHandle;

/// Live connections keyed by remote endpoint.
///
/// The accept path inserts, the close path removes; both go through the one
/// lock. Presence in the registry is what "alive" means for a connection.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<SocketAddr, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, ConnectionHandle>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, handle: ConnectionHandle) {
        let peer = handle.peer();
        if self.lock().insert(peer, handle).is_some() {
            tracing::warn!(peer = %peer, "replaced stale registry entry");
        }
    }

    /// Removes `handle`'s entry. An entry for the same endpoint that belongs
    /// to a newer connection is left alone.
    pub fn remove(&self, handle: &ConnectionHandle) -> bool {
        let peer = handle.peer();
        let mut connections = self.lock();
        let ours = connections
            .get(&peer)
            .is_some_and(|current| current.same_connection(handle));
        if ours {
            connections.remove(&peer);
        }
        ours
    }

    pub fn get(&self, peer: &SocketAddr) -> Option<ConnectionHandle> {
        self.lock().get(peer).cloned()
    }

    pub fn contains(&self, peer: &SocketAddr) -> bool {
        self.lock().contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        self.lock().keys().copied().collect()
    }
}
