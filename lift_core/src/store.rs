//! Session/entry/set store.
//!
//! The store owns one storage engine behind a mutex, so at most one
//! operation runs against the engine at a time and callers block until
//! their turn. Every public method is a single critical section.
//!
//! Missing targets are never errors: updates and deletes report `false`
//! and change nothing; retrieval returns an empty list.

use crate::ordering::{compact, next_order};
use crate::query::QueryDescriptor;
use crate::storage::StorageEngine;
use crate::translate::translate;
use crate::types::{Entry, EntryId, Session, SessionId, Set, SetId};
use crate::{Error, Result};
use std::sync::{Mutex, MutexGuard};

pub struct WorkoutStore<E> {
    engine: Mutex<E>,
}

impl<E: StorageEngine> WorkoutStore<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, E>> {
        self.engine
            .lock()
            .map_err(|_| Error::Storage("workout store lock poisoned".into()))
    }

    /// Insert a session, replacing any stored session with the same id
    ///
    /// A replaced session loses all of its previous entries and sets.
    pub fn insert_session(&self, session: Session) -> Result<()> {
        session.validate()?;
        let mut engine = self.lock()?;
        let replaced = engine.get(session.id)?.is_some();
        tracing::debug!(
            "{} session {} with {} entries",
            if replaced { "Replacing" } else { "Inserting" },
            session.id,
            session.entries.len()
        );
        engine.put(session)
    }

    /// Append entries to a session, creating the session first if needed
    ///
    /// Existing entries are untouched. Appended entries continue the
    /// session's dense order; their sets are compacted to `0..n-1`.
    pub fn insert_entries(&self, entries: Vec<Entry>, session: &Session) -> Result<()> {
        entries.iter().try_for_each(Entry::validate)?;
        let mut engine = self.lock()?;
        let mut stored = match engine.get(session.id)? {
            Some(stored) => stored,
            None => {
                tracing::debug!("Creating session {} for new entries", session.id);
                Session {
                    id: session.id,
                    date: session.date,
                    entries: Vec::new(),
                }
            }
        };

        let start = order_at(0, stored.entries.len())?;
        for (offset, mut entry) in entries.into_iter().enumerate() {
            entry.order = order_at(start, offset)?;
            compact(&mut entry.sets);
            stored.entries.push(entry);
        }

        engine.put(stored)
    }

    /// Append sets to an entry; returns how many were inserted
    ///
    /// Caller-supplied orders are ignored: sets are numbered from the
    /// entry's current maximum order plus one. A missing entry is a no-op.
    pub fn insert_sets(&self, sets: Vec<Set>, entry_id: EntryId) -> Result<usize> {
        sets.iter().try_for_each(Set::validate)?;
        let mut engine = self.lock()?;
        let Some(session_id) = engine.entry_owner(entry_id)? else {
            tracing::warn!("Entry {} not found, dropping {} sets", entry_id, sets.len());
            return Ok(0);
        };
        let Some(mut session) = engine.get(session_id)? else {
            return Ok(0);
        };
        let Some(entry) = session.entries.iter_mut().find(|e| e.id == entry_id) else {
            return Ok(0);
        };

        let start = next_order(&entry.sets).ok_or_else(|| {
            Error::Storage(format!("entry {} has no order left for new sets", entry_id))
        })?;
        let count = sets.len();
        for (offset, mut set) in sets.into_iter().enumerate() {
            set.order = order_at(start, offset)?;
            entry.sets.push(set);
        }
        tracing::debug!("Appended {} sets to entry {} from order {}", count, entry_id, start);

        engine.put(session)?;
        Ok(count)
    }

    /// Retrieve sessions matching a descriptor, or every session
    pub fn retrieve(&self, query: Option<&QueryDescriptor>) -> Result<Vec<Session>> {
        let translated = translate(query);
        let sessions = {
            let engine = self.lock()?;
            engine.select(&translated.native)?
        };

        Ok(match translated.pipeline {
            Some(pipeline) => pipeline.apply(sessions),
            None => sessions,
        })
    }

    /// One session by id, default-sorted
    pub fn session(&self, id: SessionId) -> Result<Option<Session>> {
        let query = QueryDescriptor::builder().session(id).build();
        Ok(self.retrieve(Some(&query))?.into_iter().next())
    }

    /// Delete a session with all its entries and sets
    pub fn delete_session(&self, id: SessionId) -> Result<bool> {
        let removed = self.lock()?.remove(id)?;
        if removed {
            tracing::debug!("Deleted session {}", id);
        }
        Ok(removed)
    }

    /// Delete an entry with all its sets; siblings are renumbered
    pub fn delete_entry(&self, id: EntryId) -> Result<bool> {
        let mut engine = self.lock()?;
        let Some(session_id) = engine.entry_owner(id)? else {
            return Ok(false);
        };
        let Some(mut session) = engine.get(session_id)? else {
            return Ok(false);
        };

        session.entries.retain(|e| e.id != id);
        compact(&mut session.entries);
        engine.put(session)?;

        tracing::debug!("Deleted entry {} from session {}", id, session_id);
        Ok(true)
    }

    /// Delete a set; siblings are renumbered
    pub fn delete_set(&self, id: SetId) -> Result<bool> {
        let mut engine = self.lock()?;
        let Some((session_id, entry_id)) = engine.set_owner(id)? else {
            return Ok(false);
        };
        let Some(mut session) = engine.get(session_id)? else {
            return Ok(false);
        };
        let Some(entry) = session.entries.iter_mut().find(|e| e.id == entry_id) else {
            return Ok(false);
        };

        entry.sets.retain(|s| s.id != id);
        compact(&mut entry.sets);
        engine.put(session)?;

        tracing::debug!("Deleted set {} from entry {}", id, entry_id);
        Ok(true)
    }

    /// Replace a stored session wholesale
    pub fn update_session(&self, session: Session) -> Result<bool> {
        session.validate()?;
        let mut engine = self.lock()?;
        if engine.get(session.id)?.is_none() {
            tracing::warn!("Session {} not found, update ignored", session.id);
            return Ok(false);
        }
        engine.put(session)?;
        Ok(true)
    }

    /// Replace an entry wholesale within its session
    pub fn update_entry(&self, entry: Entry, session_id: SessionId) -> Result<bool> {
        entry.validate()?;
        let mut engine = self.lock()?;
        let Some(mut session) = engine.get(session_id)? else {
            tracing::warn!("Session {} not found, entry update ignored", session_id);
            return Ok(false);
        };
        let Some(slot) = session.entries.iter_mut().find(|e| e.id == entry.id) else {
            tracing::warn!("Entry {} not in session {}, update ignored", entry.id, session_id);
            return Ok(false);
        };

        *slot = entry;
        engine.put(session)?;
        Ok(true)
    }

    /// Replace a set wholesale within its entry
    pub fn update_set(&self, set: Set, entry_id: EntryId) -> Result<bool> {
        set.validate()?;
        let mut engine = self.lock()?;
        let Some(session_id) = engine.entry_owner(entry_id)? else {
            tracing::warn!("Entry {} not found, set update ignored", entry_id);
            return Ok(false);
        };
        let Some(mut session) = engine.get(session_id)? else {
            return Ok(false);
        };
        let Some(slot) = session
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .and_then(|e| e.sets.iter_mut().find(|s| s.id == set.id))
        else {
            tracing::warn!("Set {} not in entry {}, update ignored", set.id, entry_id);
            return Ok(false);
        };

        *slot = set;
        engine.put(session)?;
        Ok(true)
    }

    /// Session owning an entry
    pub fn entry_owner(&self, id: EntryId) -> Result<Option<SessionId>> {
        self.lock()?.entry_owner(id)
    }
}

/// `start + offset`, or a storage error once orders run out
fn order_at(start: u32, offset: usize) -> Result<u32> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or_else(|| Error::Storage(format!("order overflow appending at {}", start)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryBuilder;
    use crate::storage::MemoryEngine;
    use crate::types::ExerciseId;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn store() -> WorkoutStore<MemoryEngine> {
        WorkoutStore::new(MemoryEngine::new())
    }

    fn entry_with_sets(n: usize) -> Entry {
        let sets = (0..n).map(|i| Set::new(5, 50.0 + i as f64).with_order(i as u32)).collect();
        Entry::new(ExerciseId::new(), Utc::now()).with_sets(sets)
    }

    fn set_orders(entry: &Entry) -> Vec<u32> {
        entry.sets.iter().map(|s| s.order).collect()
    }

    #[test]
    fn test_insert_session_replaces_entries() {
        let store = store();
        let mut session = Session::new(Utc::now()).with_entries(vec![entry_with_sets(2)]);
        store.insert_session(session.clone()).unwrap();

        let replacement = entry_with_sets(1);
        let replacement_id = replacement.id;
        session.entries = vec![replacement];
        store.insert_session(session.clone()).unwrap();

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(stored.entries.len(), 1);
        assert_eq!(stored.entries[0].id, replacement_id);
    }

    #[test]
    fn test_insert_entries_creates_missing_session() {
        let store = store();
        let session = Session::new(Utc::now());

        store
            .insert_entries(vec![entry_with_sets(1)], &session)
            .unwrap();

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(stored.date, session.date);
        assert_eq!(stored.entries.len(), 1);
    }

    #[test]
    fn test_insert_entries_appends_with_dense_order() {
        let store = store();
        let session = Session::new(Utc::now()).with_entries(vec![entry_with_sets(1).with_order(0)]);
        store.insert_session(session.clone()).unwrap();

        store
            .insert_entries(vec![entry_with_sets(1).with_order(7)], &session)
            .unwrap();

        let stored = store.session(session.id).unwrap().unwrap();
        let mut orders: Vec<u32> = stored.entries.iter().map(|e| e.order).collect();
        orders.sort();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_insert_sets_ignores_supplied_order() {
        let store = store();
        let entry = Entry::new(ExerciseId::new(), Utc::now());
        let entry_id = entry.id;
        let session = Session::new(Utc::now()).with_entries(vec![entry]);
        store.insert_session(session.clone()).unwrap();

        store
            .insert_sets(vec![Set::new(5, 60.0), Set::new(5, 60.0)], entry_id)
            .unwrap();
        store.insert_sets(vec![Set::new(3, 70.0)], entry_id).unwrap();

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(set_orders(&stored.entries[0]), vec![0, 1, 2]);
        assert_eq!(stored.entries[0].sets[2].reps, 3);
    }

    #[test]
    fn test_insert_sets_into_missing_entry_is_noop() {
        let store = store();
        let inserted = store.insert_sets(vec![Set::new(1, 1.0)], EntryId::new()).unwrap();
        assert_eq!(inserted, 0);
        assert!(store.retrieve(None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_session_cascades() {
        let store = store();
        let entry = entry_with_sets(3);
        let entry_id = entry.id;
        let set_id = entry.sets[0].id;
        let session = Session::new(Utc::now()).with_entries(vec![entry]);
        store.insert_session(session.clone()).unwrap();

        assert!(store.delete_session(session.id).unwrap());

        assert!(store.retrieve(None).unwrap().is_empty());
        assert!(!store.delete_entry(entry_id).unwrap());
        assert!(!store.delete_set(set_id).unwrap());
    }

    #[test]
    fn test_delete_entry_keeps_siblings_dense() {
        let store = store();
        let entries: Vec<Entry> = (0..3).map(|i| entry_with_sets(2).with_order(i)).collect();
        let middle = entries[1].id;
        let session = Session::new(Utc::now()).with_entries(entries);
        store.insert_session(session.clone()).unwrap();

        assert!(store.delete_entry(middle).unwrap());

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(stored.entries.len(), 2);
        let mut orders: Vec<u32> = stored.entries.iter().map(|e| e.order).collect();
        orders.sort();
        assert_eq!(orders, vec![0, 1]);
        assert!(stored.entries.iter().all(|e| e.sets.len() == 2));
    }

    #[test]
    fn test_delete_set_keeps_siblings_dense() {
        let store = store();
        let entry = entry_with_sets(3);
        let first = entry.sets[0].id;
        let session = Session::new(Utc::now()).with_entries(vec![entry]);
        store.insert_session(session.clone()).unwrap();

        assert!(store.delete_set(first).unwrap());

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(set_orders(&stored.entries[0]), vec![0, 1]);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let store = store();
        assert!(!store.delete_session(SessionId::new()).unwrap());
        assert!(!store.delete_entry(EntryId::new()).unwrap());
        assert!(!store.delete_set(SetId::new()).unwrap());
    }

    #[test]
    fn test_updates_on_missing_targets_are_noops() {
        let store = store();
        let session = Session::new(Utc::now());
        assert!(!store.update_session(session.clone()).unwrap());
        assert!(!store.update_entry(entry_with_sets(0), session.id).unwrap());
        assert!(!store.update_set(Set::new(1, 1.0), EntryId::new()).unwrap());
        assert!(store.retrieve(None).unwrap().is_empty());
    }

    #[test]
    fn test_update_set_replaces_fields() {
        let store = store();
        let entry = entry_with_sets(1);
        let entry_id = entry.id;
        let mut set = entry.sets[0].clone();
        let session = Session::new(Utc::now()).with_entries(vec![entry]);
        store.insert_session(session.clone()).unwrap();

        set.reps = 12;
        set.is_finished = true;
        assert!(store.update_set(set.clone(), entry_id).unwrap());

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(stored.entries[0].sets[0], set);
    }

    #[test]
    fn test_update_entry_outside_session_is_noop() {
        let store = store();
        let a = Session::new(Utc::now()).with_entries(vec![entry_with_sets(1)]);
        let b = Session::new(Utc::now() - Duration::days(1)).with_entries(vec![entry_with_sets(1)]);
        store.insert_session(a.clone()).unwrap();
        store.insert_session(b.clone()).unwrap();

        let foreign = b.entries[0].clone();
        assert!(!store.update_entry(foreign, a.id).unwrap());
    }

    #[test]
    fn test_retrieve_with_date_range() {
        let store = store();
        let now = Utc::now();
        let recent = Session::new(now);
        let old = Session::new(now - Duration::days(10));
        store.insert_session(recent.clone()).unwrap();
        store.insert_session(old).unwrap();

        let query = QueryBuilder::new()
            .date_range(now - Duration::days(1), now)
            .build();
        let sessions = store.retrieve(Some(&query)).unwrap();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, recent.id);
    }

    #[test]
    fn test_concurrent_set_inserts_stay_dense() {
        let store = Arc::new(store());
        let entry = Entry::new(ExerciseId::new(), Utc::now());
        let entry_id = entry.id;
        let session = Session::new(Utc::now()).with_entries(vec![entry]);
        store.insert_session(session.clone()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        store.insert_sets(vec![Set::new(1, 20.0)], entry_id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(set_orders(&stored.entries[0]), (0..40).collect::<Vec<u32>>());
    }

    #[test]
    fn test_insert_sets_past_the_last_order_is_an_error() {
        let store = store();
        let entry = Entry::new(ExerciseId::new(), Utc::now())
            .with_sets(vec![Set::new(5, 100.0).with_order(u32::MAX)]);
        let entry_id = entry.id;
        let session = Session::new(Utc::now()).with_entries(vec![entry]);
        store.insert_session(session.clone()).unwrap();

        let result = store.insert_sets(vec![Set::new(5, 100.0)], entry_id);
        assert!(matches!(result, Err(Error::Storage(_))));

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(set_orders(&stored.entries[0]), vec![u32::MAX]);
    }

    #[test]
    fn test_non_finite_weights_are_rejected() {
        let store = store();
        let entry = entry_with_sets(1);
        let entry_id = entry.id;
        let set_id = entry.sets[0].id;
        let session = Session::new(Utc::now()).with_entries(vec![entry]);
        store.insert_session(session.clone()).unwrap();

        let mut heavy = Set::new(5, 100.0);
        heavy.weight = f64::INFINITY;
        let result = store.insert_sets(vec![heavy], entry_id);
        assert!(matches!(result, Err(Error::InvalidWeight { .. })));

        let mut replacement = Set::new(5, 100.0);
        replacement.id = set_id;
        replacement.weight = f64::NAN;
        assert!(store.update_set(replacement, entry_id).is_err());

        let mut bad_session = Session::new(Utc::now()).with_entries(vec![entry_with_sets(1)]);
        bad_session.entries[0].sets[0].weight = -5.0;
        assert!(store.insert_session(bad_session.clone()).is_err());
        assert!(store.session(bad_session.id).unwrap().is_none());

        let stored = store.session(session.id).unwrap().unwrap();
        assert_eq!(stored.entries[0].sets.len(), 1);
        assert_eq!(stored.entries[0].sets[0].weight, 50.0);
    }
}
