use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use mongodb::bson::oid::ObjectId;
use tokio::sync::mpsc;

use crate::{error::NotifyError, services::identity::TokenVerifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Sending side of one live connection. Messages are queued to the socket
/// task that owns the receiver.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
}

impl SessionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn deliver(&self, payload: String) -> Result<(), NotifyError> {
        self.tx
            .send(payload)
            .map_err(|_| NotifyError::ConnectionClosed)
    }
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    bindings: Mutex<HashMap<ObjectId, SessionHandle>>,
}

/// Owner -> active connection, at most one per owner (last registration wins).
///
/// Created once at startup and shared through `AppState`; cloning shares the
/// same map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn bindings(&self) -> MutexGuard<'_, HashMap<ObjectId, SessionHandle>> {
        // the map stays consistent even if a holder panicked
        self.inner
            .bindings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocates a handle for a freshly accepted connection. It is not bound
    /// to anyone until registered.
    pub fn open_connection(&self) -> (SessionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        (SessionHandle { id, tx }, rx)
    }

    pub fn register(&self, owner: ObjectId, handle: SessionHandle) {
        self.bindings().insert(owner, handle);
    }

    /// Binds the connection to the token's owner. Invalid tokens bind nothing.
    pub fn register_with_token(
        &self,
        verifier: &TokenVerifier,
        token: &str,
        handle: SessionHandle,
    ) -> Option<ObjectId> {
        let owner = verifier.verify(token).ok()?;
        self.register(owner, handle);
        Some(owner)
    }

    /// Drops every binding that points at this connection and returns the
    /// owners it was bound to. A stale connection never evicts a newer one
    /// registered for the same owner.
    pub fn unregister(&self, conn: ConnectionId) -> Vec<ObjectId> {
        let mut removed = Vec::new();
        self.bindings().retain(|owner, h| {
            if h.id == conn {
                removed.push(*owner);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn lookup(&self, owner: &ObjectId) -> Option<SessionHandle> {
        self.bindings().get(owner).cloned()
    }

    pub fn len(&self) -> usize {
        self.bindings().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.bindings().clear();
    }
}
