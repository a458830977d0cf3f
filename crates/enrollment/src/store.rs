//! Session storage with per-session serialization.
//!
//! Every mutation of a session runs inside [`SessionStore::with_session`],
//! which holds that session's lock for the whole read-decide-apply sequence.
//! Different sessions never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;

use studio_core::SessionId;
use studio_scheduling::ClassSession;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session {0} already exists")]
    AlreadyExists(SessionId),

    #[error("lock poisoned")]
    Poisoned,
}

/// Store of class sessions.
///
/// Implementations must run `with_session` closures for the same session one
/// at a time, and may run closures for different sessions in parallel.
pub trait SessionStore: Send + Sync {
    /// Add a new session, then run `f` on it before any other caller can
    /// lock it. Fails if the id is already present.
    fn insert_with<R>(
        &self,
        session: ClassSession,
        f: impl FnOnce(&ClassSession) -> R,
    ) -> Result<R, StoreError>;

    /// Add a new session. Fails if the id is already present.
    fn insert(&self, session: ClassSession) -> Result<(), StoreError> {
        self.insert_with(session, |_| ())
    }

    /// Snapshot of a session.
    fn get(&self, id: &SessionId) -> Result<ClassSession, StoreError>;

    /// Run `f` with exclusive access to the session.
    fn with_session<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut ClassSession) -> R,
    ) -> Result<R, StoreError>;

    /// Delete a session, returning its last state.
    fn remove(&self, id: &SessionId) -> Result<ClassSession, StoreError>;

    /// Ids of every stored session, sorted.
    fn ids(&self) -> Result<Vec<SessionId>, StoreError>;

    /// Snapshots of every stored session, ordered by id. Sessions removed
    /// while the snapshot is taken are skipped.
    fn snapshots(&self) -> Result<Vec<ClassSession>, StoreError> {
        let mut snapshots = Vec::new();
        for id in self.ids()? {
            match self.get(&id) {
                Ok(session) => snapshots.push(session),
                Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(snapshots)
    }
}

type SessionSlot = Arc<Mutex<ClassSession>>;

/// In-memory session store: one mutex per session behind a shared index.
///
/// The index lock is held only long enough to clone a session's slot, so a
/// long-running mutation on one session never blocks lookups of another.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionSlot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &SessionId) -> Result<SessionSlot, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert_with<R>(
        &self,
        session: ClassSession,
        f: impl FnOnce(&ClassSession) -> R,
    ) -> Result<R, StoreError> {
        let id = session.id_typed().clone();
        let slot: SessionSlot = Arc::new(Mutex::new(session));
        // Locked before it becomes visible, so `f` runs ahead of every other caller.
        let guard = slot.lock().map_err(|_| StoreError::Poisoned)?;

        {
            let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
            if sessions.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }
            sessions.insert(id, Arc::clone(&slot));
        }

        Ok(f(&*guard))
    }

    fn get(&self, id: &SessionId) -> Result<ClassSession, StoreError> {
        let slot = self.slot(id)?;
        let session = slot.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(session.clone())
    }

    fn with_session<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut ClassSession) -> R,
    ) -> Result<R, StoreError> {
        let slot = self.slot(id)?;
        let mut session = slot.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut session))
    }

    fn remove(&self, id: &SessionId) -> Result<ClassSession, StoreError> {
        let slot = {
            let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
            sessions
                .remove(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?
        };

        // Wait for any in-flight mutation before handing back the final state.
        let session = slot.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(session.clone())
    }

    fn ids(&self) -> Result<Vec<SessionId>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        let mut ids: Vec<SessionId> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
