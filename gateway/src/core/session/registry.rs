//! Active call lookup by call identifier.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::{SessionError, SessionResult};
use super::state::SessionState;

/// A registry entry. Cheap to clone; the session itself stays with its task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    connection_id: Uuid,
    state: watch::Receiver<SessionState>,
    cancel: CancellationToken,
    bound_at: Instant,
}

impl SessionHandle {
    pub fn new(
        connection_id: Uuid,
        state: watch::Receiver<SessionState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connection_id,
            state,
            cancel,
            bound_at: Instant::now(),
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn bound_at(&self) -> Instant {
        self.bound_at
    }

    /// Whether the owning session has released its resources.
    pub fn is_released(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Sessions keyed by call identifier. Only bound sessions are registered.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly bound session. A call id held by a live session
    /// is rejected; an entry left behind by a released one is replaced.
    pub fn register(&self, call_id: &str, handle: SessionHandle) -> SessionResult<()> {
        match self.sessions.entry(call_id.to_string()) {
            Entry::Occupied(mut existing) => {
                if !existing.get().is_released() {
                    return Err(SessionError::DuplicateCall(call_id.to_string()));
                }
                existing.insert(handle);
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Remove `call_id` if it is still owned by `connection_id`.
    pub fn remove(&self, call_id: &str, connection_id: Uuid) -> bool {
        self.sessions
            .remove_if(call_id, |_, handle| handle.connection_id == connection_id)
            .is_some()
    }

    pub fn get(&self, call_id: &str) -> Option<SessionHandle> {
        self.sessions.get(call_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.sessions.contains_key(call_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}
