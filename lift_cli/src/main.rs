use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use lift_core::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

type Service = TrackService<SnapshotEngine, InMemoryCatalog>;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Workout log with per-day sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log one set of an exercise
    Log {
        /// Exercise name or id
        #[arg(long)]
        exercise: String,

        #[arg(long)]
        reps: u32,

        /// Weight in kg (finite, zero or more)
        #[arg(long, default_value_t = 0.0, value_parser = parse_weight)]
        weight: f64,

        /// Mark the set as finished
        #[arg(long)]
        finished: bool,

        /// Day to log on (YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show logged sessions
    Show {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Only sessions and entries for this exercise
        #[arg(long)]
        exercise: Option<String>,

        /// Hide unfinished sets
        #[arg(long)]
        finished_only: bool,

        /// Show at most this many sessions, newest first
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Move an entry to a new position within its session
    MoveEntry {
        #[arg(long)]
        session: Uuid,

        #[arg(long)]
        entry: Uuid,

        #[arg(long)]
        order: u32,
    },

    /// Delete an exercise and every entry recording it
    DeleteExercise {
        /// Exercise name or id
        #[arg(long)]
        exercise: String,
    },

    /// List the exercise catalog
    Exercises,

    /// Add a user-defined exercise
    AddExercise {
        #[arg(long)]
        name: String,

        /// chest, back, legs, shoulders, arms, core, cardio or other
        #[arg(long, default_value = "other")]
        category: String,
    },

    /// Export every set to CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    lift_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let exercises_path = config.data.exercises_path(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    let catalog = InMemoryCatalog::from_sources(&config.catalog_sources(&data_dir))?;
    let errors = catalog.validate()?;
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    let engine = SnapshotEngine::open(config.data.store_path(&data_dir))?;
    let service = TrackService::new(Arc::new(WorkoutStore::new(engine)), Arc::new(catalog))
        .with_calendar(config.calendar()?);

    match cli.command {
        Commands::Log {
            exercise,
            reps,
            weight,
            finished,
            date,
        } => cmd_log(&service, &exercise, reps, weight, finished, date),
        Commands::Show {
            from,
            to,
            exercise,
            finished_only,
            limit,
        } => cmd_show(&service, from, to, exercise.as_deref(), finished_only, limit),
        Commands::MoveEntry {
            session,
            entry,
            order,
        } => cmd_move_entry(&service, session.into(), entry.into(), order),
        Commands::DeleteExercise { exercise } => {
            cmd_delete_exercise(&service, &exercise, &exercises_path)
        }
        Commands::Exercises => cmd_exercises(&service),
        Commands::AddExercise { name, category } => {
            cmd_add_exercise(&service, &name, &category, &exercises_path)
        }
        Commands::Export { out } => cmd_export(&service, &out),
    }
}

fn parse_weight(arg: &str) -> std::result::Result<f64, String> {
    let weight: f64 = arg.trim().parse().map_err(|e| format!("{}", e))?;
    if weight.is_finite() && weight >= 0.0 {
        Ok(weight)
    } else {
        Err(format!("weight must be a finite number of kg, zero or more (got {})", arg))
    }
}

/// Accept an exercise id or a case-insensitive name
fn resolve_exercise(service: &Service, arg: &str) -> Result<Exercise> {
    let catalog = service.catalog();
    if let Ok(id) = Uuid::parse_str(arg) {
        let id = ExerciseId::from(id);
        if let Some(info) = catalog.lookup(id)? {
            return Ok(Exercise {
                id,
                name: info.name,
                category: info.category,
            });
        }
    }
    catalog
        .find_by_name(arg)?
        .ok_or_else(|| Error::Other(format!("Unknown exercise: {}", arg)))
}

fn exercise_name(service: &Service, id: ExerciseId) -> Result<String> {
    Ok(service
        .catalog()
        .lookup(id)?
        .map(|info| info.name)
        .unwrap_or_else(|| format!("<unknown {}>", id)))
}

fn cmd_log(
    service: &Service,
    exercise: &str,
    reps: u32,
    weight: f64,
    finished: bool,
    date: Option<NaiveDate>,
) -> Result<()> {
    let exercise = resolve_exercise(service, exercise)?;
    let now = Utc::now();
    let performed_at: DateTime<Utc> = match date {
        Some(day) => service.calendar().start_of(day) + Duration::hours(12),
        None => now,
    };

    let mut set = Set::new(reps, weight);
    set.is_finished = finished;
    let entry = Entry::new(exercise.id, now).with_sets(vec![set]);
    let session = Session::new(performed_at).with_entries(vec![entry]);

    let session_id = service.add_session(session)?;

    println!(
        "✓ Logged {} x {} kg {} on {}",
        reps,
        weight,
        exercise.name,
        service.calendar().day_of(performed_at)
    );
    println!("  Session: {}", session_id);
    Ok(())
}

fn cmd_show(
    service: &Service,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    exercise: Option<&str>,
    finished_only: bool,
    limit: Option<usize>,
) -> Result<()> {
    let calendar = service.calendar();
    let mut query = QueryBuilder::new();

    if from.is_some() || to.is_some() {
        let start = from.map_or(DateTime::<Utc>::MIN_UTC, |d| calendar.bounds_of(d).0);
        let end = to.map_or(DateTime::<Utc>::MAX_UTC, |d| calendar.bounds_of(d).1);
        query = query.date_range(start, end);
    }
    if let Some(exercise) = exercise {
        let exercise = resolve_exercise(service, exercise)?;
        query = query
            .containing_exercises([exercise.id])
            .only_entries_for([exercise.id]);
    }
    if finished_only {
        query = query.only_finished_sets();
    }
    query = query
        .sort(SortField::SessionDate, SortDirection::Descending)
        .sort(SortField::EntryOrder, SortDirection::Ascending);
    if let Some(n) = limit {
        query = query.limit(n);
    }

    let sessions = service.sessions(Some(&query.build()))?;
    if sessions.is_empty() {
        println!("No sessions logged.");
        return Ok(());
    }

    for session in &sessions {
        println!("{}  (session {})", calendar.day_of(session.date), session.id);
        for entry in &session.entries {
            println!(
                "  [{}] {}  (entry {})",
                entry.order,
                exercise_name(service, entry.exercise_id)?,
                entry.id
            );
            for set in &entry.sets {
                println!(
                    "      {}. {} x {} kg{}",
                    set.order + 1,
                    set.reps,
                    set.weight,
                    if set.is_finished { " ✓" } else { "" }
                );
            }
        }
        println!();
    }
    Ok(())
}

fn cmd_move_entry(
    service: &Service,
    session_id: SessionId,
    entry_id: EntryId,
    order: u32,
) -> Result<()> {
    let entry = service
        .store()
        .session(session_id)?
        .and_then(|s| s.entry(entry_id).cloned());
    let Some(entry) = entry else {
        println!("Entry {} not found in session {}.", entry_id, session_id);
        return Ok(());
    };

    service.update_entry(entry.with_order(order), session_id)?;
    println!("✓ Moved entry {} to position {}", entry_id, order);
    Ok(())
}

fn cmd_delete_exercise(service: &Service, exercise: &str, exercises_path: &Path) -> Result<()> {
    let exercise = resolve_exercise(service, exercise)?;
    let removed = service.delete_exercise(exercise.id)?;
    service.catalog().save_user_exercises(exercises_path)?;

    println!(
        "✓ Deleted exercise {} and {} entries",
        exercise.name, removed
    );
    Ok(())
}

fn cmd_exercises(service: &Service) -> Result<()> {
    for exercise in service.catalog().all()? {
        println!(
            "{}  {}  ({})",
            exercise.id, exercise.name, exercise.category
        );
    }
    Ok(())
}

fn cmd_add_exercise(
    service: &Service,
    name: &str,
    category: &str,
    exercises_path: &Path,
) -> Result<()> {
    if service.catalog().find_by_name(name)?.is_some() {
        return Err(Error::CatalogValidation(format!(
            "Exercise '{}' already exists",
            name
        )));
    }

    let exercise = Exercise::new(name.trim(), Category::parse(category));
    let id = exercise.id;
    service.catalog().add(exercise)?;
    service.catalog().save_user_exercises(exercises_path)?;

    println!("✓ Added exercise {} ({})", name.trim(), id);
    Ok(())
}

fn cmd_export(service: &Service, out: &Path) -> Result<()> {
    let sessions = service.sessions(None)?;
    let rows = export_csv(&sessions, service.catalog(), out)?;
    println!("✓ Exported {} sets to {}", rows, out.display());
    Ok(())
}
