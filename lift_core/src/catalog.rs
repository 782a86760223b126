//! Exercise catalog.
//!
//! The workout log only stores exercise ids; the catalog resolves them to
//! a name and category. A catalog is assembled from several sources
//! (built-ins, config-defined exercises, a user file) that are loaded in
//! turn and layered on top of each other.

use crate::types::{Category, Exercise, ExerciseId, ExerciseInfo};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Lookup and maintenance of exercise definitions
pub trait ExerciseCatalog: Send + Sync {
    /// Resolve an exercise; `None` if it does not exist
    fn lookup(&self, id: ExerciseId) -> Result<Option<ExerciseInfo>>;

    /// Add or overwrite an exercise
    fn add(&self, exercise: Exercise) -> Result<()>;

    /// Update an existing exercise; false if it does not exist
    fn update(&self, exercise: Exercise) -> Result<bool>;

    /// Remove an exercise; false if it did not exist
    fn remove(&self, id: ExerciseId) -> Result<bool>;

    /// Every exercise, sorted by name
    fn all(&self) -> Result<Vec<Exercise>>;
}

// ============================================================================
// Built-in Exercises
// ============================================================================

/// Stable ids of the built-in exercises
pub mod builtin {
    use super::*;

    pub const BACK_SQUAT: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0001));
    pub const BENCH_PRESS: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0002));
    pub const DEADLIFT: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0003));
    pub const OVERHEAD_PRESS: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0004));
    pub const BARBELL_ROW: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0005));
    pub const PULL_UP: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0006));
    pub const DIP: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0007));
    pub const BICEPS_CURL: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0008));
    pub const PLANK: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_0009));
    pub const ROWING_MACHINE: ExerciseId = ExerciseId(Uuid::from_u128(0x6c1f_0001_0000_4000_8000_0000_0000_000a));
}

/// Cached built-in exercise list - built once and reused
static BUILTIN_EXERCISES: Lazy<Vec<Exercise>> = Lazy::new(|| {
    let exercise = |id, name: &str, category| Exercise {
        id,
        name: name.into(),
        category,
    };

    vec![
        exercise(builtin::BACK_SQUAT, "Back Squat", Category::Legs),
        exercise(builtin::BENCH_PRESS, "Bench Press", Category::Chest),
        exercise(builtin::DEADLIFT, "Deadlift", Category::Back),
        exercise(builtin::OVERHEAD_PRESS, "Overhead Press", Category::Shoulders),
        exercise(builtin::BARBELL_ROW, "Barbell Row", Category::Back),
        exercise(builtin::PULL_UP, "Pull-up", Category::Back),
        exercise(builtin::DIP, "Dip", Category::Chest),
        exercise(builtin::BICEPS_CURL, "Biceps Curl", Category::Arms),
        exercise(builtin::PLANK, "Plank", Category::Core),
        exercise(builtin::ROWING_MACHINE, "Rowing Machine", Category::Cardio),
    ]
});

/// Get a reference to the cached built-in exercises
pub fn builtin_exercises() -> &'static [Exercise] {
    &BUILTIN_EXERCISES
}

pub fn is_builtin(id: ExerciseId) -> bool {
    BUILTIN_EXERCISES.iter().any(|e| e.id == id)
}

// ============================================================================
// Sources
// ============================================================================

/// User catalog file format
///
/// `removed` records deleted exercises so built-ins stay deleted across
/// loads.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserCatalogFile {
    #[serde(default)]
    exercises: Vec<Exercise>,
    #[serde(default)]
    removed: Vec<ExerciseId>,
}

/// One place exercises come from
#[derive(Clone, Debug)]
pub enum CatalogSource {
    /// The built-in exercise list
    BuiltIn,
    /// Exercises given directly (e.g. from the config file)
    Custom(Vec<Exercise>),
    /// A user catalog file; missing means empty
    File(PathBuf),
}

/// Exercises contributed by a source, plus ids it deletes
#[derive(Debug, Default)]
struct CatalogLayer {
    exercises: Vec<Exercise>,
    removed: Vec<ExerciseId>,
}

impl CatalogSource {
    fn load(&self) -> Result<CatalogLayer> {
        match self {
            CatalogSource::BuiltIn => Ok(CatalogLayer {
                exercises: builtin_exercises().to_vec(),
                removed: Vec::new(),
            }),
            CatalogSource::Custom(exercises) => Ok(CatalogLayer {
                exercises: exercises.clone(),
                removed: Vec::new(),
            }),
            CatalogSource::File(path) => {
                if !path.exists() {
                    tracing::debug!("No user catalog at {:?}", path);
                    return Ok(CatalogLayer::default());
                }
                let contents = std::fs::read_to_string(path)?;
                let file: UserCatalogFile = serde_json::from_str(&contents)?;
                tracing::debug!(
                    "Loaded {} user exercises from {:?}",
                    file.exercises.len(),
                    path
                );
                Ok(CatalogLayer {
                    exercises: file.exercises,
                    removed: file.removed,
                })
            }
        }
    }
}

// ============================================================================
// In-memory Catalog
// ============================================================================

#[derive(Debug, Default)]
struct CatalogState {
    exercises: HashMap<ExerciseId, Exercise>,
    removed: HashSet<ExerciseId>,
    /// Exercises as the config defines them; only edits get saved
    configured: HashMap<ExerciseId, Exercise>,
}

/// Thread-safe catalog held in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with only the built-in exercises
    pub fn with_builtins() -> Self {
        Self::from_exercises(builtin_exercises().to_vec())
    }

    pub fn from_exercises(exercises: impl IntoIterator<Item = Exercise>) -> Self {
        let state = CatalogState {
            exercises: exercises.into_iter().map(|e| (e.id, e)).collect(),
            ..CatalogState::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Load every source in order; later sources override earlier ones
    pub fn from_sources(sources: &[CatalogSource]) -> Result<Self> {
        let mut state = CatalogState::default();
        for source in sources {
            let layer = source.load()?;
            if let CatalogSource::Custom(_) = source {
                for exercise in &layer.exercises {
                    state.configured.insert(exercise.id, exercise.clone());
                }
            }
            for exercise in layer.exercises {
                state.removed.remove(&exercise.id);
                state.exercises.insert(exercise.id, exercise);
            }
            for id in layer.removed {
                state.exercises.remove(&id);
                state.removed.insert(id);
            }
        }
        tracing::info!("Catalog loaded with {} exercises", state.exercises.len());
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|_| Error::Catalog("catalog lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|_| Error::Catalog("catalog lock poisoned".into()))
    }

    /// Find an exercise by case-insensitive name
    pub fn find_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .read()?
            .exercises
            .values()
            .find(|e| e.name.to_lowercase() == wanted)
            .cloned())
    }

    /// Persist user-defined exercises and removals
    ///
    /// Built-ins and config-defined exercises are not written unless they
    /// were modified, so later config edits still take effect.
    pub fn save_user_exercises(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = {
            let state = self.read()?;
            let mut exercises: Vec<Exercise> = state
                .exercises
                .values()
                .filter(|e| !builtin_exercises().contains(e))
                .filter(|e| state.configured.get(&e.id) != Some(*e))
                .cloned()
                .collect();
            exercises.sort_by(|a, b| a.name.cmp(&b.name));
            let mut removed: Vec<ExerciseId> = state.removed.iter().copied().collect();
            removed.sort();
            UserCatalogFile { exercises, removed }
        };

        let contents = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved user catalog to {:?}", path);
        Ok(())
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Result<Vec<String>> {
        let state = self.read()?;
        let mut errors = Vec::new();
        let mut seen: HashMap<(Category, String), ExerciseId> = HashMap::new();

        let mut exercises: Vec<&Exercise> = state.exercises.values().collect();
        exercises.sort_by_key(|e| e.id);

        for exercise in exercises {
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise '{}' has empty name", exercise.id));
                continue;
            }
            let key = (exercise.category, exercise.name.trim().to_lowercase());
            if let Some(other) = seen.insert(key, exercise.id) {
                errors.push(format!(
                    "Exercises '{}' and '{}' share the name '{}' in {}",
                    other, exercise.id, exercise.name, exercise.category
                ));
            }
        }

        Ok(errors)
    }
}

impl ExerciseCatalog for InMemoryCatalog {
    fn lookup(&self, id: ExerciseId) -> Result<Option<ExerciseInfo>> {
        Ok(self.read()?.exercises.get(&id).map(ExerciseInfo::from))
    }

    fn add(&self, exercise: Exercise) -> Result<()> {
        let mut state = self.write()?;
        state.removed.remove(&exercise.id);
        tracing::debug!("Adding exercise '{}' ({})", exercise.name, exercise.id);
        state.exercises.insert(exercise.id, exercise);
        Ok(())
    }

    fn update(&self, exercise: Exercise) -> Result<bool> {
        let mut state = self.write()?;
        match state.exercises.get_mut(&exercise.id) {
            Some(slot) => {
                *slot = exercise;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, id: ExerciseId) -> Result<bool> {
        let mut state = self.write()?;
        let removed = state.exercises.remove(&id).is_some();
        if removed {
            state.removed.insert(id);
        }
        Ok(removed)
    }

    fn all(&self) -> Result<Vec<Exercise>> {
        let mut exercises: Vec<Exercise> = self.read()?.exercises.values().cloned().collect();
        exercises.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(exercises)
    }
}
