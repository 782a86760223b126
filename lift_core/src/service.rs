//! Workout tracking service.
//!
//! Enforces the invariants the store itself does not:
//! - one session per calendar day (same-day sessions are merged)
//! - one entry per exercise per session (same-exercise entries are merged)
//! - entries must reference an exercise the catalog can resolve
//! - moving an entry or set renumbers all of its siblings
//! - deleting an exercise removes every entry recording it
//!
//! The service holds no mutable state of its own. Operations that make
//! several store calls are not atomic across those calls.

use crate::calendar::Calendar;
use crate::catalog::ExerciseCatalog;
use crate::ordering::{compact, renumber, reorder};
use crate::query::{QueryBuilder, QueryDescriptor, SortDirection, SortField};
use crate::storage::StorageEngine;
use crate::store::WorkoutStore;
use crate::types::{Entry, EntryId, ExerciseId, Session, SessionId, Set, SetId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct TrackService<E, C> {
    store: Arc<WorkoutStore<E>>,
    catalog: Arc<C>,
    calendar: Calendar,
}

impl<E, C> Clone for TrackService<E, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            calendar: self.calendar,
        }
    }
}

impl<E: StorageEngine, C: ExerciseCatalog> TrackService<E, C> {
    /// Service deciding calendar days in UTC
    pub fn new(store: Arc<WorkoutStore<E>>, catalog: Arc<C>) -> Self {
        Self {
            store,
            catalog,
            calendar: Calendar::utc(),
        }
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn store(&self) -> &WorkoutStore<E> {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn sessions(&self, query: Option<&QueryDescriptor>) -> Result<Vec<Session>> {
        self.store.retrieve(query)
    }

    /// The session stored for the calendar day containing `ts`
    ///
    /// If several exist (they can only come from raw store writes), the
    /// earliest wins.
    pub fn session_on(&self, ts: DateTime<Utc>) -> Result<Option<Session>> {
        let (start, end) = self.calendar.day_bounds(ts);
        let query = QueryBuilder::new()
            .date_range(start, end)
            .sort(SortField::SessionDate, SortDirection::Ascending)
            .limit(1)
            .build();
        Ok(self.store.retrieve(Some(&query))?.into_iter().next())
    }

    // ------------------------------------------------------------------
    // Inserts
    // ------------------------------------------------------------------

    pub fn add_sessions(&self, sessions: Vec<Session>) -> Result<Vec<SessionId>> {
        sessions
            .into_iter()
            .map(|session| self.add_session(session))
            .collect()
    }

    /// Add a session, merging into an existing session on the same day
    ///
    /// Returns the id of the session that now holds the entries.
    pub fn add_session(&self, session: Session) -> Result<SessionId> {
        if let Some(existing) = self.session_on(session.date)? {
            tracing::debug!(
                "Session {} falls on the day of {}, merging {} entries",
                session.id,
                existing.id,
                session.entries.len()
            );
            self.add_entries(session.entries, &existing)?;
            return Ok(existing.id);
        }

        let Session { id, date, entries } = session;
        let mut prepared: Vec<Entry> = Vec::new();
        for entry in entries {
            if !self.resolves(entry.exercise_id)? {
                continue;
            }
            let same_exercise = prepared
                .iter()
                .position(|e| e.exercise_id == entry.exercise_id);
            match same_exercise {
                Some(index) => merge_sets(&mut prepared[index], entry.sets),
                None => {
                    let mut entry = entry;
                    dedup_sets(&mut entry.sets);
                    prepared.push(entry);
                }
            }
        }
        renumber(&mut prepared);
        for entry in prepared.iter_mut() {
            renumber(&mut entry.sets);
        }

        tracing::debug!("Inserting new session {} with {} entries", id, prepared.len());
        self.store.insert_session(Session {
            id,
            date,
            entries: prepared,
        })?;
        Ok(id)
    }

    /// Add entries to a session, merging by exercise
    ///
    /// - entries whose exercise the catalog cannot resolve are skipped
    /// - an entry for an exercise the session already records has its
    ///   sets merged into the existing entry
    /// - anything else is appended with its sets renumbered
    ///
    /// The session is created if it does not exist yet.
    pub fn add_entries(&self, entries: Vec<Entry>, session: &Session) -> Result<()> {
        let current = self.store.session(session.id)?;
        let existing: HashMap<ExerciseId, EntryId> = current
            .iter()
            .flat_map(|s| s.entries.iter())
            .map(|e| (e.exercise_id, e.id))
            .collect();

        let mut fresh: Vec<Entry> = Vec::new();
        for mut entry in entries {
            if !self.resolves(entry.exercise_id)? {
                continue;
            }
            if let Some(&target) = existing.get(&entry.exercise_id) {
                self.add_sets(entry.sets, target)?;
                continue;
            }
            if let Some(pending) = fresh
                .iter_mut()
                .find(|e| e.exercise_id == entry.exercise_id)
            {
                merge_sets(pending, entry.sets);
                continue;
            }
            dedup_sets(&mut entry.sets);
            renumber(&mut entry.sets);
            fresh.push(entry);
        }

        if !fresh.is_empty() || current.is_none() {
            self.store.insert_entries(fresh, session)?;
        }
        Ok(())
    }

    /// Add sets to an entry, skipping ids it already has
    ///
    /// Surviving sets are numbered after the entry's current maximum
    /// order. Returns how many were added.
    pub fn add_sets(&self, sets: Vec<Set>, entry_id: EntryId) -> Result<usize> {
        let Some(entry) = self.find_entry(entry_id)?.map(|(_, entry)| entry) else {
            tracing::warn!("Entry {} not found, dropping {} sets", entry_id, sets.len());
            return Ok(0);
        };

        let mut seen: HashSet<SetId> = entry.sets.iter().map(|s| s.id).collect();
        let fresh: Vec<Set> = sets.into_iter().filter(|s| seen.insert(s.id)).collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        self.store.insert_sets(fresh, entry_id)
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Replace an entry and move it to its requested order
    ///
    /// Fails with [`Error::DuplicateExerciseInSession`] if another entry
    /// in the session already records the new exercise; nothing is
    /// written in that case. Returns false if the entry is not in the
    /// session.
    pub fn update_entry(&self, mut entry: Entry, session_id: SessionId) -> Result<bool> {
        let Some(mut session) = self.store.session(session_id)? else {
            return Ok(false);
        };
        if session.entry(entry.id).is_none() {
            tracing::warn!("Entry {} not in session {}, update ignored", entry.id, session_id);
            return Ok(false);
        }
        if session
            .entries
            .iter()
            .any(|e| e.id != entry.id && e.exercise_id == entry.exercise_id)
        {
            return Err(Error::DuplicateExerciseInSession {
                session: session_id,
                exercise: entry.exercise_id,
            });
        }

        compact(&mut entry.sets);
        session.entries = reorder(std::mem::take(&mut session.entries), entry);
        self.store.update_session(session)
    }

    /// Replace a set and move it to its requested order
    pub fn update_set(&self, set: Set, entry_id: EntryId) -> Result<bool> {
        let Some((session_id, mut entry)) = self.find_entry(entry_id)? else {
            return Ok(false);
        };
        if entry.set(set.id).is_none() {
            tracing::warn!("Set {} not in entry {}, update ignored", set.id, entry_id);
            return Ok(false);
        }

        entry.sets = reorder(std::mem::take(&mut entry.sets), set);
        self.store.update_entry(entry, session_id)
    }

    // ------------------------------------------------------------------
    // Deletes
    // ------------------------------------------------------------------

    pub fn delete_session(&self, id: SessionId) -> Result<bool> {
        self.store.delete_session(id)
    }

    pub fn delete_entry(&self, id: EntryId) -> Result<bool> {
        self.store.delete_entry(id)
    }

    pub fn delete_set(&self, id: SetId) -> Result<bool> {
        self.store.delete_set(id)
    }

    /// Remove an exercise from the catalog and every entry recording it
    ///
    /// Returns the number of entries removed.
    pub fn delete_exercise(&self, id: ExerciseId) -> Result<usize> {
        self.catalog.remove(id)?;

        let query = QueryBuilder::new()
            .containing_exercises([id])
            .only_entries_for([id])
            .build();
        let sessions = self.store.retrieve(Some(&query))?;

        let mut removed = 0;
        for entry in sessions.iter().flat_map(|s| s.entries.iter()) {
            if self.store.delete_entry(entry.id)? {
                removed += 1;
            }
        }

        tracing::info!(
            "Deleted exercise {} and {} entries across {} sessions",
            id,
            removed,
            sessions.len()
        );
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn resolves(&self, id: ExerciseId) -> Result<bool> {
        let found = self.catalog.lookup(id)?.is_some();
        if !found {
            tracing::warn!("Exercise {} not in catalog, skipping entry", id);
        }
        Ok(found)
    }

    fn find_entry(&self, entry_id: EntryId) -> Result<Option<(SessionId, Entry)>> {
        let Some(session_id) = self.store.entry_owner(entry_id)? else {
            return Ok(None);
        };
        Ok(self
            .store
            .session(session_id)?
            .and_then(|s| s.entry(entry_id).cloned())
            .map(|entry| (session_id, entry)))
    }
}

/// Drop sets whose id appeared earlier in the list
fn dedup_sets(sets: &mut Vec<Set>) {
    let mut seen = HashSet::new();
    sets.retain(|s| seen.insert(s.id));
}

/// Append sets not already in `target`, numbered after its last set
fn merge_sets(target: &mut Entry, sets: Vec<Set>) {
    let mut seen: HashSet<SetId> = target.sets.iter().map(|s| s.id).collect();
    target
        .sets
        .extend(sets.into_iter().filter(|s| seen.insert(s.id)));
    renumber(&mut target.sets);
}
