//! Query descriptors for retrieving sessions.
//!
//! A [`QueryDescriptor`] is an immutable description of a retrieval:
//! identity, date-range and exercise-membership filters, sort keys, and
//! an ordered list of in-memory post-processing transforms. Descriptors
//! are assembled with [`QueryBuilder`], whose methods never mutate the
//! receiver: each call returns a new builder.

use crate::types::{ExerciseId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Fields a query may sort on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Session timestamp
    SessionDate,
    /// Entry creation timestamp, within each session
    EntryCreatedAt,
    /// The user's custom entry order, within each session
    EntryOrder,
    /// Set weight, within each entry
    SetWeight,
}

impl SortField {
    /// Whether the storage engine can sort on this field directly
    pub fn is_native(&self) -> bool {
        !matches!(self, SortField::EntryOrder)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Inclusive `[start, end]` timestamp interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// In-memory transform applied after native retrieval
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostProcess {
    /// Sort each session's entries by their custom `order`
    SortEntriesByOrder { direction: SortDirection },
    /// Drop sets that are not finished
    OnlyFinishedSets,
    /// Drop entries whose exercise is not in the set
    OnlyEntriesFor { exercise_ids: BTreeSet<ExerciseId> },
    /// Keep the first `n` sessions
    Limit { n: usize },
}

/// Immutable retrieval request
///
/// Every filter is optional; `None` means "unset", which differs from an
/// empty set (an empty membership filter matches nothing).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    session_id: Option<SessionId>,
    date_range: Option<DateRange>,
    exercise_ids: Option<BTreeSet<ExerciseId>>,
    sort_keys: Option<Vec<SortKey>>,
    post_processing: Option<Vec<PostProcess>>,
}

impl QueryDescriptor {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    pub fn exercise_ids(&self) -> Option<&BTreeSet<ExerciseId>> {
        self.exercise_ids.as_ref()
    }

    pub fn sort_keys(&self) -> Option<&[SortKey]> {
        self.sort_keys.as_deref()
    }

    pub fn post_processing(&self) -> Option<&[PostProcess]> {
        self.post_processing.as_deref()
    }
}

/// Copy-on-write builder for [`QueryDescriptor`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    descriptor: QueryDescriptor,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match exactly one session
    pub fn session(&self, id: SessionId) -> Self {
        let mut next = self.clone();
        next.descriptor.session_id = Some(id);
        next
    }

    /// Match sessions dated within `[start, end]`
    ///
    /// Bounds are used as given; use `Calendar::bounds_of` to widen a day
    /// to its first and last instants.
    pub fn date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.descriptor.date_range = Some(DateRange::new(start, end));
        next
    }

    /// Append a sort key
    ///
    /// Sorting by custom entry order becomes a post-processing step,
    /// placed at this point in the pipeline.
    pub fn sort(&self, field: SortField, direction: SortDirection) -> Self {
        if !field.is_native() {
            return self.post_process(PostProcess::SortEntriesByOrder { direction });
        }
        let mut next = self.clone();
        next.descriptor
            .sort_keys
            .get_or_insert_with(Vec::new)
            .push(SortKey { field, direction });
        next
    }

    /// Match sessions containing at least one entry for any of `ids`
    ///
    /// Replaces a previous membership filter.
    pub fn containing_exercises<I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = ExerciseId>,
    {
        let mut next = self.clone();
        next.descriptor.exercise_ids = Some(ids.into_iter().collect());
        next
    }

    /// Keep only finished sets in the result
    pub fn only_finished_sets(&self) -> Self {
        self.post_process(PostProcess::OnlyFinishedSets)
    }

    /// Keep only entries recording one of `ids`
    pub fn only_entries_for<I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = ExerciseId>,
    {
        self.post_process(PostProcess::OnlyEntriesFor {
            exercise_ids: ids.into_iter().collect(),
        })
    }

    /// Keep the first `n` sessions
    pub fn limit(&self, n: usize) -> Self {
        self.post_process(PostProcess::Limit { n })
    }

    pub fn build(&self) -> QueryDescriptor {
        self.descriptor.clone()
    }

    fn post_process(&self, step: PostProcess) -> Self {
        let mut next = self.clone();
        next.descriptor
            .post_processing
            .get_or_insert_with(Vec::new)
            .push(step);
        next
    }
}
