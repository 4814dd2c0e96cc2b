use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use tokio::{
    sync::{mpsc::UnboundedReceiver, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, warn};

use super::{
    ConfigChange, ConfigError,
    broadcast::SubscriberRegistry,
    persistence::{DurableFile, Snapshot},
};

/// The single consumer of the change queue.
///
/// For each change: notify matching subscribers, then persist the whole
/// mapping. Owned by the store and joined in `stop()`.
pub(crate) struct EventWorker {
    pub(crate) queue: UnboundedReceiver<ConfigChange>,
    pub(crate) shutdown: watch::Receiver<bool>,
    pub(crate) entries: Arc<RwLock<Snapshot>>,
    pub(crate) registry: SubscriberRegistry,
    pub(crate) file: Arc<DurableFile>,
    pub(crate) idle_timeout: Duration,
}

impl EventWorker {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(idle_timeout = ?self.idle_timeout, "Config event worker started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                received = timeout(self.idle_timeout, self.queue.recv()) => match received {
                    Ok(Some(change)) => self.process(change).await,
                    Ok(None) => {
                        debug!("Change queue closed");
                        break;
                    }
                    Err(_) => continue,
                },
            }
        }

        let mut discarded = 0usize;
        while self.queue.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            warn!(discarded, "Discarding unprocessed changes on shutdown");
        }

        info!("Config event worker stopped");
    }

    async fn process(&self, change: ConfigChange) {
        let report = self.registry.dispatch(&change).await;
        debug!(
            key = %change.key,
            removal = change.is_removal(),
            delivered = report.delivered,
            failed = report.failed,
            "Dispatched config change"
        );

        // Failures are already recorded in the file's status.
        let _ = persist_latest(&self.file, &self.entries).await;
    }
}

/// Runs a full persistence cycle on the blocking pool.
pub(crate) async fn persist_latest(
    file: &Arc<DurableFile>,
    entries: &Arc<RwLock<Snapshot>>,
) -> Result<(), ConfigError> {
    let file = file.clone();
    let entries = entries.clone();
    let path = file.path().to_path_buf();

    tokio::task::spawn_blocking(move || file.persist_latest(&entries))
        .await
        .map_err(|e| {
            error!(error = %e, "Persistence task failed");
            ConfigError::PersistenceError {
                path,
                details: format!("persistence task failed: {e}"),
            }
        })?
}
