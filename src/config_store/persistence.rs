use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use super::{ConfigEntry, ConfigError};

/// The full key → entry mapping, as held in memory and written to disk.
pub type Snapshot = BTreeMap<String, ConfigEntry>;

const TEMP_SUFFIX: &str = ".tmp";

/// What happened when the durable file was read at startup.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The file was parsed successfully.
    Loaded {
        /// Number of entries restored.
        entries: usize,
    },
    /// No file exists yet; the store starts empty.
    Missing,
    /// The file exists but is empty; the store starts empty.
    Empty,
    /// The file could not be read or parsed; the store starts empty.
    Failed(ConfigError),
}

/// Health of the durable mirror, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistenceStatus {
    /// Completed temp-write-then-rename cycles.
    pub writes: u64,
    /// Cycles that failed before the rename.
    pub failures: u64,
    /// Time of the last completed cycle.
    pub last_success: Option<DateTime<Utc>>,
    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

/// The on-disk mirror of the configuration mapping.
///
/// Every write goes to a sibling temp file which is then renamed over the
/// target, so the target is always a complete snapshot. Only one write is
/// in flight at a time.
#[derive(Debug)]
pub struct DurableFile {
    path: PathBuf,
    temp_path: PathBuf,
    write_lock: Mutex<()>,
    status: Mutex<PersistenceStatus>,
}

/// A snapshot written to the temp file but not yet renamed into place.
///
/// Holds the write lock until committed or dropped. Dropping it without
/// committing removes the temp file and leaves the target untouched.
#[must_use = "a staged snapshot does nothing until committed"]
pub struct StagedSnapshot<'a> {
    file: &'a DurableFile,
    _guard: MutexGuard<'a, ()>,
    committed: bool,
}

impl DurableFile {
    /// Creates a handle for the durable file at `path`. Touches nothing on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut temp = OsString::from(path.as_os_str());
        temp.push(TEMP_SUFFIX);

        Self {
            path,
            temp_path: PathBuf::from(temp),
            write_lock: Mutex::new(()),
            status: Mutex::new(PersistenceStatus::default()),
        }
    }

    /// Path of the durable file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the transient temp file used during a write.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Reads the mapping from disk, falling back to an empty one.
    ///
    /// Never fails: problems are reported through the returned `LoadOutcome`.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> (Snapshot, LoadOutcome) {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config file found, starting empty");
                return (Snapshot::new(), LoadOutcome::Missing);
            }
            Err(e) => {
                let err = self.load_error(e);
                warn!(error = %err, "Config file unreadable, starting empty");
                return (Snapshot::new(), LoadOutcome::Failed(err));
            }
        };

        if content.trim().is_empty() {
            info!("Config file is empty, starting empty");
            return (Snapshot::new(), LoadOutcome::Empty);
        }

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => {
                info!(entries = snapshot.len(), "Loaded config file");
                let entries = snapshot.len();
                (snapshot, LoadOutcome::Loaded { entries })
            }
            Err(e) => {
                let err = self.load_error(e);
                warn!(error = %err, "Config file malformed, starting empty");
                (Snapshot::new(), LoadOutcome::Failed(err))
            }
        }
    }

    /// Removes a temp file left behind by an interrupted write.
    ///
    /// Returns true if one was found.
    pub fn remove_stale_temp(&self) -> bool {
        match fs::remove_file(&self.temp_path) {
            Ok(()) => {
                warn!(path = %self.temp_path.display(), "Removed stale temp file");
                true
            }
            Err(_) => false,
        }
    }

    /// Writes `snapshot` to the temp file without touching the target.
    ///
    /// # Errors
    /// * `ConfigError::SerializationError` - the mapping cannot be encoded
    /// * `ConfigError::PersistenceError` - the temp file cannot be written
    pub fn stage(&self, snapshot: &Snapshot) -> Result<StagedSnapshot<'_>, ConfigError> {
        let guard = self.lock_writes();
        self.stage_locked(guard, snapshot)
    }

    /// Atomically replaces the durable file with `snapshot`.
    ///
    /// The outcome is recorded in `status()`; failures are also logged.
    ///
    /// # Errors
    /// Returns the serialization or I/O error. The previous file is left intact.
    #[instrument(skip_all, fields(path = %self.path.display(), entries = snapshot.len()))]
    pub fn persist(&self, snapshot: &Snapshot) -> Result<(), ConfigError> {
        let guard = self.lock_writes();
        let result = self
            .stage_locked(guard, snapshot)
            .and_then(StagedSnapshot::commit);

        self.record(result)
    }

    /// Persists whatever `entries` holds once this write gets its turn.
    ///
    /// The mapping is read after the write lock is taken, so writes land in
    /// the same order as the states they capture and the last write always
    /// reflects the latest mapping.
    ///
    /// # Errors
    /// Same as `persist`.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn persist_latest(&self, entries: &RwLock<Snapshot>) -> Result<(), ConfigError> {
        let guard = self.lock_writes();
        let snapshot = entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let result = self
            .stage_locked(guard, &snapshot)
            .and_then(StagedSnapshot::commit);

        self.record(result)
    }

    /// Current persistence health.
    pub fn status(&self) -> PersistenceStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn stage_locked<'a>(
        &'a self,
        guard: MutexGuard<'a, ()>,
        snapshot: &Snapshot,
    ) -> Result<StagedSnapshot<'a>, ConfigError> {
        let json =
            serde_json::to_string_pretty(snapshot).map_err(|e| ConfigError::SerializationError {
                content_type: "config mapping".to_string(),
                details: e.to_string(),
            })?;

        let staged = StagedSnapshot {
            file: self,
            _guard: guard,
            committed: false,
        };

        self.ensure_parent_dir()?;
        self.write_temp(json.as_bytes())?;

        Ok(staged)
    }

    fn record(&self, result: Result<(), ConfigError>) -> Result<(), ConfigError> {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);

        match &result {
            Ok(()) => {
                debug!("Persisted config mapping");
                status.writes += 1;
                status.last_success = Some(Utc::now());
            }
            Err(e) => {
                error!(error = %e, "Failed to persist config mapping");
                status.failures += 1;
                status.last_error = Some(e.to_string());
            }
        }

        result
    }

    fn write_temp(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        let mut file = File::create(&self.temp_path).map_err(|e| self.persistence_error(e))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| self.persistence_error(e))
    }

    fn ensure_parent_dir(&self) -> Result<(), ConfigError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| ConfigError::PersistenceError {
                    path: parent.to_path_buf(),
                    details: format!("Failed to create config directory: {e}"),
                })
            }
            _ => Ok(()),
        }
    }

    fn persistence_error(&self, e: impl ToString) -> ConfigError {
        ConfigError::PersistenceError {
            path: self.path.clone(),
            details: e.to_string(),
        }
    }

    fn load_error(&self, e: impl ToString) -> ConfigError {
        ConfigError::LoadError {
            path: self.path.clone(),
            details: e.to_string(),
        }
    }
}

impl StagedSnapshot<'_> {
    /// Renames the temp file over the durable file.
    ///
    /// # Errors
    /// Returns `ConfigError::PersistenceError` if the rename fails.
    pub fn commit(mut self) -> Result<(), ConfigError> {
        fs::rename(&self.file.temp_path, &self.file.path)
            .map_err(|e| self.file.persistence_error(e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedSnapshot<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.file.temp_path);
        }
    }
}
