use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{
        Mutex as AsyncMutex,
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        watch,
    },
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::StoreSettings;

use super::{
    ChangeHandler, ConfigChange, ConfigEntry, ConfigError, EntryInput, LoadOutcome,
    PersistenceStatus, Scope, Subscription, SubscriptionId,
    broadcast::SubscriberRegistry,
    persistence::{DurableFile, Snapshot},
    worker::{EventWorker, persist_latest},
};

const WATCH_BUFFER_SIZE: usize = 100;

enum Lifecycle {
    Idle,
    Running(JoinHandle<()>),
    /// Worker joined, final write still owed.
    Draining,
    Stopped,
}

/// In-memory agent configuration store with a durable JSON mirror and
/// change notifications.
///
/// Reads are served from memory. `update` mutates memory and queues a change;
/// a single background worker notifies subscribers and rewrites the file.
/// Cloning is cheap and every clone shares the same state.
///
/// `start()` must complete before `update` or `delete` are called; until
/// then, and after `stop()`, both return `ConfigError::NotRunning`.
#[derive(Clone)]
pub struct ConfigStore {
    entries: Arc<RwLock<Snapshot>>,
    file: Arc<DurableFile>,
    registry: SubscriberRegistry,

    queue_tx: UnboundedSender<ConfigChange>,
    queue_rx: Arc<Mutex<Option<UnboundedReceiver<ConfigChange>>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,

    running: Arc<AtomicBool>,
    lifecycle: Arc<AsyncMutex<Lifecycle>>,
    idle_timeout: Duration,
    handler_timeout: Duration,
}

impl ConfigStore {
    /// Creates an idle store backed by the file at `path`, with default settings otherwise.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_settings(&StoreSettings::new(path))
    }

    /// Creates an idle store from resolved settings.
    pub fn from_settings(settings: &StoreSettings) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            file: Arc::new(DurableFile::new(settings.store_path.clone())),
            registry: SubscriberRegistry::new(settings.handler_timeout),
            queue_tx,
            queue_rx: Arc::new(Mutex::new(Some(queue_rx))),
            shutdown_tx: Arc::new(shutdown_tx),
            running: Arc::new(AtomicBool::new(false)),
            lifecycle: Arc::new(AsyncMutex::new(Lifecycle::Idle)),
            idle_timeout: settings.idle_timeout,
            handler_timeout: settings.handler_timeout,
        }
    }

    /// Loads the durable file and starts the background worker.
    ///
    /// A missing or malformed file is not an error: the store starts empty and
    /// the returned `LoadOutcome` says why. A temp file left by an interrupted
    /// write is removed.
    ///
    /// # Errors
    /// * `ConfigError::AlreadyStarted` - the store is already running
    /// * `ConfigError::NotRunning` - the store has been stopped
    #[instrument(skip(self), fields(path = %self.file.path().display()))]
    pub async fn start(&self) -> Result<LoadOutcome, ConfigError> {
        let mut lifecycle = self.lifecycle.lock().await;

        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running(_) => return Err(ConfigError::AlreadyStarted),
            Lifecycle::Draining | Lifecycle::Stopped => return Err(ConfigError::NotRunning),
        }

        let queue = self
            .queue_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ConfigError::AlreadyStarted)?;

        self.file.remove_stale_temp();
        let (snapshot, outcome) = self.file.load();

        {
            let mut entries = self.write_entries()?;
            *entries = snapshot;
            self.running.store(true, Ordering::Release);
        }

        let worker = EventWorker {
            queue,
            shutdown: self.shutdown_tx.subscribe(),
            entries: self.entries.clone(),
            registry: self.registry.clone(),
            file: self.file.clone(),
            idle_timeout: self.idle_timeout,
        };
        *lifecycle = Lifecycle::Running(worker.spawn());

        info!(entries = self.len(), "Config store started");
        Ok(outcome)
    }

    /// Stops the worker and writes the final state to disk.
    ///
    /// Idempotent: later calls return `Ok(())` without doing anything, as does
    /// calling it on a store that was never started. Changes still queued when
    /// the worker exits are not delivered to subscribers, but their data is
    /// covered by the final write. Channel subscriptions are closed, including
    /// any opened afterwards.
    ///
    /// The worker gets one idle timeout plus one handler timeout to finish
    /// before it is aborted. If this future is dropped before it resolves, the
    /// store is not marked stopped; a later `stop()` finishes the shutdown and
    /// the final write.
    ///
    /// # Errors
    /// Returns `ConfigError::PersistenceError` if the final write fails; the
    /// next call retries it.
    #[instrument(skip(self), fields(path = %self.file.path().display()))]
    pub async fn stop(&self) -> Result<(), ConfigError> {
        let mut lifecycle = self.lifecycle.lock().await;

        match &mut *lifecycle {
            Lifecycle::Idle | Lifecycle::Stopped => return Ok(()),
            Lifecycle::Draining => {}
            Lifecycle::Running(worker) => {
                self.halt_worker(worker).await;
                *lifecycle = Lifecycle::Draining;
                self.registry.close();
            }
        }

        persist_latest(&self.file, &self.entries).await?;
        *lifecycle = Lifecycle::Stopped;

        info!(entries = self.len(), "Config store stopped");
        Ok(())
    }

    /// Returns the entry for `key`, or `None` if there is none.
    pub fn get(&self, key: &str) -> Option<ConfigEntry> {
        self.read_entries().get(key).cloned()
    }

    /// Returns all keys, sorted.
    pub fn list_keys(&self) -> Vec<String> {
        self.read_entries().keys().cloned().collect()
    }

    /// Returns a copy of the whole mapping.
    pub fn entries(&self) -> BTreeMap<String, ConfigEntry> {
        self.read_entries().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Replaces the entry for `key` and queues a change notification.
    ///
    /// Returns the stored entry with its fresh `updated_at`. The new value is
    /// visible to `get` as soon as this returns; subscribers and the file are
    /// updated later by the worker.
    ///
    /// # Errors
    /// * `ConfigError::NotRunning` - the store is not started
    /// * `ConfigError::Validation` - the key or payload is rejected; nothing changes
    /// * `ConfigError::LockError` - the mapping lock is poisoned
    #[instrument(skip(self, input))]
    pub fn update(&self, key: &str, input: EntryInput) -> Result<ConfigEntry, ConfigError> {
        if key.trim().is_empty() {
            return Err(ConfigError::validation("key", "agent id cannot be empty"));
        }
        input.validate()?;

        let mut entries = self.write_entries()?;
        if !self.running.load(Ordering::Acquire) {
            return Err(ConfigError::NotRunning);
        }

        let previous = entries.get(key).cloned();
        let entry = input.into_entry(previous.as_ref());
        entries.insert(key.to_string(), entry.clone());

        // Queued under the lock so per-key events keep mutation order.
        self.enqueue(ConfigChange::new(
            key.to_string(),
            previous,
            Some(entry.clone()),
        ));

        debug!(updated_at = %entry.updated_at, "Updated config entry");
        Ok(entry)
    }

    /// Removes the entry for `key` and writes the smaller mapping to disk
    /// before returning.
    ///
    /// A failed write is logged and shows up in `persistence_status()`; the
    /// removal still stands in memory. Subscribers then receive a removal
    /// change through the worker.
    ///
    /// # Errors
    /// * `ConfigError::NotRunning` - the store is not started
    /// * `ConfigError::NotFound` - no entry for `key`; nothing changes
    /// * `ConfigError::LockError` - the mapping lock is poisoned
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<ConfigEntry, ConfigError> {
        let removed = {
            let mut entries = self.write_entries()?;
            if !self.running.load(Ordering::Acquire) {
                return Err(ConfigError::NotRunning);
            }

            let removed = entries
                .remove(key)
                .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;

            self.enqueue(ConfigChange::new(
                key.to_string(),
                Some(removed.clone()),
                None,
            ));
            removed
        };

        if let Err(e) = persist_latest(&self.file, &self.entries).await {
            warn!(error = %e, "Entry removed from memory but not from disk");
        }

        debug!("Deleted config entry");
        Ok(removed)
    }

    /// Registers a handler for changes in `scope`.
    ///
    /// Handlers run on the worker, never inside `update`. For each change,
    /// exact-key handlers run before `Scope::All` handlers, each group in
    /// registration order. A handler that fails, panics or outlives the
    /// handler timeout does not stop the others. After `stop()` the handler
    /// is dropped without being registered.
    pub fn subscribe(&self, scope: Scope, handler: impl ChangeHandler) -> SubscriptionId {
        self.registry.register(scope, Arc::new(handler))
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    /// Opens a channel subscription for changes in `scope`.
    ///
    /// The subscription unregisters itself when dropped. If its buffer fills
    /// up, further changes are dropped for it and logged.
    pub fn watch(&self, scope: Scope) -> Subscription {
        Subscription::open(&self.registry, scope, WATCH_BUFFER_SIZE)
    }

    /// Health of the durable mirror.
    pub fn persistence_status(&self) -> PersistenceStatus {
        self.file.status()
    }

    /// Path of the durable file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns true between a successful `start()` and `stop()`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn halt_worker(&self, worker: &mut JoinHandle<()>) {
        {
            let _entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            self.running.store(false, Ordering::Release);
        }
        let _ = self.shutdown_tx.send(true);

        let grace = self.idle_timeout + self.handler_timeout;
        match timeout(grace, &mut *worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Config event worker ended abnormally"),
            Err(_) => {
                warn!(?grace, "Config event worker did not stop in time; aborting");
                worker.abort();
            }
        }
    }

    fn enqueue(&self, change: ConfigChange) {
        if self.queue_tx.send(change).is_err() {
            warn!("Change queue closed; notification dropped");
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> Result<RwLockWriteGuard<'_, Snapshot>, ConfigError> {
        self.entries.write().map_err(|e| ConfigError::LockError {
            lock_type: "write".to_string(),
            details: format!("Failed to acquire write lock for entries: {e}"),
        })
    }
}
