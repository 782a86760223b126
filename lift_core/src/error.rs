//! Error types for the lift_core library.

use crate::types::{ExerciseId, SessionId, SetId};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
///
/// Missing sessions, entries and sets are never errors: updates and deletes
/// against them are no-ops. The domain errors are the duplicate-exercise
/// check and weights the log cannot store; everything else is
/// infrastructure and propagates unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Exercise catalog lookup or mutation failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Physical storage engine failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// An entry update would place the same exercise twice in one session
    #[error("Exercise {exercise} already has an entry in session {session}")]
    DuplicateExerciseInSession {
        session: SessionId,
        exercise: ExerciseId,
    },

    /// A set weight that is not a finite, non-negative number
    #[error("Set {set} has invalid weight {weight}")]
    InvalidWeight { set: SetId, weight: f64 },

    /// Generic error
    #[error("{0}")]
    Other(String),
}
