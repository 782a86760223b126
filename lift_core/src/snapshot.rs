//! JSON snapshot engine with file locking.
//!
//! The whole workout log is held in memory and mirrored to a single JSON
//! file. Every mutation rewrites the snapshot atomically so a crash never
//! leaves a half-written log behind.
//!
//! An engine holds an exclusive lock on a `<log>.lock` sidecar from open
//! until drop, so a second process opening the same log waits for the
//! first to finish instead of overwriting its changes.

use crate::storage::{MemoryEngine, StorageEngine};
use crate::translate::NativeQuery;
use crate::types::{EntryId, Session, SessionId, SetId};
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk layout of the snapshot file
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    sessions: Vec<Session>,
}

/// A [`MemoryEngine`] persisted to a JSON file after every write
#[derive(Debug)]
pub struct SnapshotEngine {
    path: PathBuf,
    inner: MemoryEngine,
    /// Released when the engine is dropped
    _lock: File,
}

impl SnapshotEngine {
    /// Open the snapshot at `path`, blocking while another engine holds it
    ///
    /// A missing file is an empty log. A file that exists but cannot be
    /// parsed is an error: the log is never silently replaced.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lock = acquire_lock(&path)?;

        if !path.exists() {
            tracing::info!("No workout log at {:?}, starting empty", path);
            return Ok(Self {
                path,
                inner: MemoryEngine::new(),
                _lock: lock,
            });
        }

        let mut contents = String::new();
        std::io::BufReader::new(File::open(&path)?).read_to_string(&mut contents)?;

        let snapshot: SnapshotFile = serde_json::from_str(&contents)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Storage(format!(
                "unsupported snapshot version {} in {:?}",
                snapshot.version, path
            )));
        }

        tracing::info!(
            "Opened workout log {:?} ({} sessions)",
            path,
            snapshot.sessions.len()
        );
        Ok(Self {
            path,
            inner: MemoryEngine::from_sessions(snapshot.sessions),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically write the current state
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn persist(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;

        {
            let snapshot = SnapshotRef {
                version: SNAPSHOT_VERSION,
                sessions: self.inner.sessions().collect(),
            };
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved workout log to {:?}", self.path);
        Ok(())
    }
}

/// `<log>.lock` next to the log file
fn lock_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "workouts".into());
    name.push(".lock");
    path.with_file_name(name)
}

fn acquire_lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    if file.try_lock_exclusive().is_err() {
        tracing::info!("Waiting for another process to release {:?}", lock_path);
        file.lock_exclusive()?;
    }
    Ok(file)
}

/// Borrowing twin of [`SnapshotFile`] so writes don't clone the log
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    sessions: Vec<&'a Session>,
}

impl StorageEngine for SnapshotEngine {
    fn select(&self, query: &NativeQuery) -> Result<Vec<Session>> {
        self.inner.select(query)
    }

    fn get(&self, id: SessionId) -> Result<Option<Session>> {
        self.inner.get(id)
    }

    fn put(&mut self, session: Session) -> Result<()> {
        session.validate()?;
        let id = session.id;
        let previous = self.inner.get(id)?;

        self.inner.put(session)?;
        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => self.inner.put(previous)?,
                None => {
                    self.inner.remove(id)?;
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, id: SessionId) -> Result<bool> {
        let Some(previous) = self.inner.get(id)? else {
            return Ok(false);
        };

        self.inner.remove(id)?;
        if let Err(e) = self.persist() {
            self.inner.put(previous)?;
            return Err(e);
        }
        Ok(true)
    }

    fn entry_owner(&self, id: EntryId) -> Result<Option<SessionId>> {
        self.inner.entry_owner(id)
    }

    fn set_owner(&self, id: SetId) -> Result<Option<(SessionId, EntryId)>> {
        self.inner.set_owner(id)
    }
}
