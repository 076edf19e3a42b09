//! Registry of connected clients

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-unique identifier of a client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Set of live client connections, shared by all sessions
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, SocketAddr>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a connection. The entry lives exactly as long as the returned guard.
    pub fn register(self: &Arc<Self>, addr: SocketAddr) -> ClientGuard {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().insert(id, addr);

        ClientGuard {
            id,
            addr,
            registry: Arc::clone(self),
        }
    }

    /// Number of connected clients
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.read().contains_key(&id)
    }

    /// Peer addresses of all connected clients
    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.read().values().copied().collect()
    }

    fn unregister(&self, id: ClientId) -> bool {
        self.write().remove(&id).is_some()
    }

    // Poisoning is ignored: a single insert or remove never leaves the map torn.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ClientId, SocketAddr>> {
        self.clients.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ClientId, SocketAddr>> {
        self.clients.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Registry membership of one connection; removes the entry on drop
#[derive(Debug)]
pub struct ClientGuard {
    id: ClientId,
    addr: SocketAddr,
    registry: Arc<ClientRegistry>,
}

impl ClientGuard {
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        if self.registry.unregister(self.id) {
            tracing::debug!(client = %self.id, remaining = self.registry.len(), "Client unregistered");
        }
    }
}
