//! Physical storage engines.
//!
//! An engine holds whole session trees: a session owns its entries and
//! each entry owns its sets, so removing a session removes everything
//! beneath it. The [`WorkoutStore`](crate::store::WorkoutStore) is the
//! only caller and serializes access.

use crate::translate::{apply_native_sort, NativeQuery};
use crate::types::{EntryId, Session, SessionId, SetId};
use crate::Result;
use std::collections::BTreeMap;

/// Narrow contract the store needs from a physical engine
pub trait StorageEngine: Send {
    /// Sessions matching the native filter, sorted by the native keys
    fn select(&self, query: &NativeQuery) -> Result<Vec<Session>>;

    fn get(&self, id: SessionId) -> Result<Option<Session>>;

    /// Insert or replace a whole session tree
    fn put(&mut self, session: Session) -> Result<()>;

    /// Remove a session and everything it owns; false if it was absent
    fn remove(&mut self, id: SessionId) -> Result<bool>;

    /// Session owning an entry
    fn entry_owner(&self, id: EntryId) -> Result<Option<SessionId>>;

    /// Session and entry owning a set
    fn set_owner(&self, id: SetId) -> Result<Option<(SessionId, EntryId)>>;
}

/// Volatile engine backed by an ordered map
#[derive(Clone, Debug, Default)]
pub struct MemoryEngine {
    sessions: BTreeMap<SessionId, Session>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        Self {
            sessions: sessions.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub(crate) fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}

impl StorageEngine for MemoryEngine {
    fn select(&self, query: &NativeQuery) -> Result<Vec<Session>> {
        let mut matched: Vec<Session> = match query.filter.session_id {
            Some(id) => self.sessions.get(&id).cloned().into_iter().collect(),
            None => self.sessions.values().cloned().collect(),
        };
        matched.retain(|s| query.filter.matches(s));
        apply_native_sort(&mut matched, &query.sort);
        Ok(matched)
    }

    fn get(&self, id: SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.get(&id).cloned())
    }

    fn put(&mut self, session: Session) -> Result<()> {
        self.sessions.insert(session.id, session);
        Ok(())
    }

    fn remove(&mut self, id: SessionId) -> Result<bool> {
        Ok(self.sessions.remove(&id).is_some())
    }

    fn entry_owner(&self, id: EntryId) -> Result<Option<SessionId>> {
        Ok(self
            .sessions
            .values()
            .find(|s| s.entries.iter().any(|e| e.id == id))
            .map(|s| s.id))
    }

    fn set_owner(&self, id: SetId) -> Result<Option<(SessionId, EntryId)>> {
        Ok(self.sessions.values().find_map(|s| {
            s.entries
                .iter()
                .find(|e| e.sets.iter().any(|set| set.id == id))
                .map(|e| (s.id, e.id))
        }))
    }
}
