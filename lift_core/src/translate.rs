//! Query translation.
//!
//! Splits a [`QueryDescriptor`] into the part a storage engine executes
//! natively (filter + sort keys) and a residual in-memory [`Pipeline`]
//! for transforms the engine cannot express.

use crate::query::{DateRange, PostProcess, QueryDescriptor, SortDirection, SortField, SortKey};
use crate::types::{Entry, ExerciseId, Session, SessionId, Set};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Predicate handed to the storage engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeFilter {
    pub session_id: Option<SessionId>,
    pub date_range: Option<DateRange>,
    pub exercise_ids: Option<BTreeSet<ExerciseId>>,
}

impl NativeFilter {
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(id) = self.session_id {
            if session.id != id {
                return false;
            }
        }
        if let Some(range) = &self.date_range {
            if !range.contains(session.date) {
                return false;
            }
        }
        if let Some(ids) = &self.exercise_ids {
            if !session.entries.iter().any(|e| ids.contains(&e.exercise_id)) {
                return false;
            }
        }
        true
    }
}

/// Filter and sort keys executed by the storage engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeQuery {
    pub filter: NativeFilter,
    pub sort: Vec<SortKey>,
}

impl NativeQuery {
    /// Every session, default ordering
    pub fn all() -> Self {
        Self::default()
    }

    pub fn session(id: SessionId) -> Self {
        Self {
            filter: NativeFilter {
                session_id: Some(id),
                ..NativeFilter::default()
            },
            sort: Vec::new(),
        }
    }
}

/// Ordered in-memory transforms run after retrieval
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<PostProcess>,
}

impl Pipeline {
    pub fn new(steps: Vec<PostProcess>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PostProcess] {
        &self.steps
    }

    /// Run every step in declaration order; each sees the previous output
    pub fn apply(&self, sessions: Vec<Session>) -> Vec<Session> {
        self.steps.iter().fold(sessions, |acc, step| apply_step(step, acc))
    }
}

/// A descriptor split into native and residual parts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslatedQuery {
    pub native: NativeQuery,
    pub pipeline: Option<Pipeline>,
}

/// Translate a descriptor; `None` retrieves everything in default order
pub fn translate(descriptor: Option<&QueryDescriptor>) -> TranslatedQuery {
    let Some(descriptor) = descriptor else {
        return TranslatedQuery::default();
    };

    let filter = NativeFilter {
        session_id: descriptor.session_id(),
        date_range: descriptor.date_range(),
        exercise_ids: descriptor.exercise_ids().cloned(),
    };

    // Keys the engine cannot sort on run first in the pipeline
    let (sort, residual): (Vec<SortKey>, Vec<SortKey>) = descriptor
        .sort_keys()
        .unwrap_or_default()
        .iter()
        .copied()
        .partition(|k| k.field.is_native());

    let steps: Vec<PostProcess> = residual
        .into_iter()
        .map(|k| PostProcess::SortEntriesByOrder {
            direction: k.direction,
        })
        .chain(descriptor.post_processing().unwrap_or_default().iter().cloned())
        .collect();
    let pipeline = (!steps.is_empty()).then(|| Pipeline::new(steps));

    TranslatedQuery {
        native: NativeQuery { filter, sort },
        pipeline,
    }
}

/// Sort sessions, their entries and their sets
///
/// Explicit keys come first; the default ordering then breaks ties so the
/// result never depends on engine iteration order:
/// - sessions: `date`, then `id`
/// - entries: `created_at`, then `order`, then `id`
/// - sets: `order`, then `id`
pub fn apply_native_sort(sessions: &mut [Session], keys: &[SortKey]) {
    for session in sessions.iter_mut() {
        for entry in session.entries.iter_mut() {
            entry.sets.sort_by(|a, b| compare_sets(a, b, keys));
        }
        session.entries.sort_by(|a, b| compare_entries(a, b, keys));
    }
    sessions.sort_by(|a, b| compare_sessions(a, b, keys));
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

fn explicit<F>(keys: &[SortKey], field: SortField, cmp: F) -> Ordering
where
    F: Fn() -> Ordering,
{
    keys.iter()
        .filter(|k| k.field == field)
        .fold(Ordering::Equal, |acc, k| acc.then_with(|| directed(cmp(), k.direction)))
}

fn compare_sessions(a: &Session, b: &Session, keys: &[SortKey]) -> Ordering {
    explicit(keys, SortField::SessionDate, || a.date.cmp(&b.date))
        .then_with(|| a.date.cmp(&b.date))
        .then_with(|| a.id.cmp(&b.id))
}

fn compare_entries(a: &Entry, b: &Entry, keys: &[SortKey]) -> Ordering {
    explicit(keys, SortField::EntryCreatedAt, || a.created_at.cmp(&b.created_at))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.order.cmp(&b.order))
        .then_with(|| a.id.cmp(&b.id))
}

fn compare_sets(a: &Set, b: &Set, keys: &[SortKey]) -> Ordering {
    explicit(keys, SortField::SetWeight, || a.weight.total_cmp(&b.weight))
        .then_with(|| a.order.cmp(&b.order))
        .then_with(|| a.id.cmp(&b.id))
}

fn apply_step(step: &PostProcess, mut sessions: Vec<Session>) -> Vec<Session> {
    match step {
        PostProcess::SortEntriesByOrder { direction } => {
            for session in sessions.iter_mut() {
                session.entries.sort_by(|a, b| {
                    directed(a.order.cmp(&b.order), *direction).then_with(|| a.id.cmp(&b.id))
                });
            }
        }
        PostProcess::OnlyFinishedSets => {
            for entry in sessions.iter_mut().flat_map(|s| s.entries.iter_mut()) {
                entry.sets.retain(|set| set.is_finished);
            }
        }
        PostProcess::OnlyEntriesFor { exercise_ids } => {
            for session in sessions.iter_mut() {
                session
                    .entries
                    .retain(|e| exercise_ids.contains(&e.exercise_id));
            }
        }
        PostProcess::Limit { n } => sessions.truncate(*n),
    }
    sessions
}
