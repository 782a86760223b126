//! Core domain types for the workout log.
//!
//! This module defines the fundamental types used throughout the system:
//! - Opaque identifiers for every entity
//! - The session → entry → set hierarchy
//! - Exercise definitions resolved through the catalog

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identifier of a workout session
    SessionId
);
id_type!(
    /// Identifier of an entry within a session
    EntryId
);
id_type!(
    /// Identifier of a set within an entry
    SetId
);
id_type!(
    /// Identifier of an exercise in the catalog
    ExerciseId
);

// ============================================================================
// Workout Hierarchy
// ============================================================================

/// One repetition-and-weight unit within an entry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Set {
    pub id: SetId,
    pub reps: u32,
    pub weight: f64,
    pub is_finished: bool,
    pub order: u32,
}

impl Set {
    /// Create an unfinished set. Negative weights are clamped to zero.
    pub fn new(reps: u32, weight: f64) -> Self {
        Self {
            id: SetId::new(),
            reps,
            weight: weight.max(0.0),
            is_finished: false,
            order: 0,
        }
    }

    pub fn finished(mut self) -> Self {
        self.is_finished = true;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Weight must be finite and non-negative; JSON cannot hold anything else
    pub fn validate(&self) -> Result<()> {
        if self.weight.is_finite() && self.weight >= 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidWeight {
                set: self.id,
                weight: self.weight,
            })
        }
    }
}

/// One exercise performed within a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub exercise_id: ExerciseId,
    pub sets: Vec<Set>,
    pub created_at: DateTime<Utc>,
    pub order: u32,
}

impl Entry {
    pub fn new(exercise_id: ExerciseId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(),
            exercise_id,
            sets: Vec::new(),
            created_at,
            order: 0,
        }
    }

    pub fn with_sets(mut self, sets: Vec<Set>) -> Self {
        self.sets = sets;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Find a set owned by this entry
    pub fn set(&self, id: SetId) -> Option<&Set> {
        self.sets.iter().find(|s| s.id == id)
    }

    pub fn validate(&self) -> Result<()> {
        self.sets.iter().try_for_each(Set::validate)
    }
}

/// One calendar-day workout record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub date: DateTime<Utc>,
    pub entries: Vec<Entry>,
}

impl Session {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            date,
            entries: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: Vec<Entry>) -> Self {
        self.entries = entries;
        self
    }

    /// Find an entry owned by this session
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Find the entry recording a given exercise, if any
    pub fn entry_for_exercise(&self, exercise_id: ExerciseId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.exercise_id == exercise_id)
    }

    pub fn validate(&self) -> Result<()> {
        self.entries.iter().try_for_each(Entry::validate)
    }
}

// ============================================================================
// Exercise Types
// ============================================================================

/// Muscle-group category of an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Chest,
    Back,
    Legs,
    Shoulders,
    Arms,
    Core,
    Cardio,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chest => "chest",
            Category::Back => "back",
            Category::Legs => "legs",
            Category::Shoulders => "shoulders",
            Category::Arms => "arms",
            Category::Core => "core",
            Category::Cardio => "cardio",
            Category::Other => "other",
        }
    }

    /// Parse a category name, falling back to `Other`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "chest" => Category::Chest,
            "back" => Category::Back,
            "legs" | "leg" => Category::Legs,
            "shoulders" | "shoulder" => Category::Shoulders,
            "arms" | "arm" => Category::Arms,
            "core" | "abs" => Category::Core,
            "cardio" => Category::Cardio,
            _ => Category::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exercise definition (e.g., "Back Squat")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub category: Category,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            id: ExerciseId::new(),
            name: name.into(),
            category,
        }
    }
}

/// Displayable information returned by a catalog lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExerciseInfo {
    pub name: String,
    pub category: Category,
}

impl From<&Exercise> for ExerciseInfo {
    fn from(exercise: &Exercise) -> Self {
        Self {
            name: exercise.name.clone(),
            category: exercise.category,
        }
    }
}
