//! CSV export of logged sets.
//!
//! Flattens the session → entry → set hierarchy into one row per set so
//! the log can be opened in a spreadsheet.

use crate::catalog::ExerciseCatalog;
use crate::types::Session;
use crate::Result;
use std::fs::File;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    session_id: String,
    date: String,
    exercise_id: String,
    exercise: &'a str,
    entry_order: u32,
    set_order: u32,
    reps: u32,
    weight: f64,
    finished: bool,
}

/// Write every set of `sessions` to `path`, replacing any existing file
///
/// Rows follow the order of `sessions`, their entries and their sets.
/// Exercises the catalog no longer knows export with an empty name.
/// Returns the number of rows written.
pub fn export_csv(
    sessions: &[Session],
    catalog: &dyn ExerciseCatalog,
    path: &Path,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    let mut rows = 0;
    for session in sessions {
        let date = session.date.to_rfc3339();
        for entry in &session.entries {
            let name = catalog
                .lookup(entry.exercise_id)?
                .map(|info| info.name)
                .unwrap_or_default();
            for set in &entry.sets {
                writer.serialize(CsvRow {
                    session_id: session.id.to_string(),
                    date: date.clone(),
                    exercise_id: entry.exercise_id.to_string(),
                    exercise: &name,
                    entry_order: entry.order,
                    set_order: set.order,
                    reps: set.reps,
                    weight: set.weight,
                    finished: set.is_finished,
                })?;
                rows += 1;
            }
        }
    }

    // Flush and sync to disk
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} sets to {:?}", rows, path);
    Ok(rows)
}
