#![forbid(unsafe_code)]

//! Core domain model and consistency engine for the Lift workout log.
//!
//! This crate provides:
//! - Domain types (sessions, entries, sets, exercises)
//! - Dense sibling ordering
//! - Query descriptors and their translation to storage primitives
//! - Storage engines (in-memory, JSON snapshot) behind a serialized store
//! - The exercise catalog
//! - The tracking service enforcing the log's invariants
//! - CSV export

pub mod types;
pub mod error;
pub mod calendar;
pub mod ordering;
pub mod query;
pub mod translate;
pub mod storage;
pub mod snapshot;
pub mod store;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod service;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use calendar::Calendar;
pub use catalog::{CatalogSource, ExerciseCatalog, InMemoryCatalog};
pub use config::Config;
pub use query::{QueryBuilder, QueryDescriptor, SortDirection, SortField};
pub use storage::{MemoryEngine, StorageEngine};
pub use snapshot::SnapshotEngine;
pub use store::WorkoutStore;
pub use service::TrackService;
pub use export::export_csv;
