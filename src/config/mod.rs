//! Store settings: where the durable file lives and how the worker idles.
//!
//! Settings come from defaults, an optional TOML file, environment variables
//! and finally command-line overrides, each layer replacing the previous one.

mod error;
mod loading;
mod paths;

#[cfg(test)]
mod tests;

use std::{path::PathBuf, time::Duration};

pub use error::SettingsError;
pub use loading::{ENV_HANDLER_TIMEOUT_MS, ENV_IDLE_TIMEOUT_MS, ENV_STORE_PATH};
pub use paths::{ConfigPaths, DEFAULT_STORE_FILE};

/// Default bound on how long the worker waits for a change before
/// re-checking for shutdown.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default bound on a single change handler invocation.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolved settings for a `ConfigStore`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Path of the durable JSON file.
    pub store_path: PathBuf,
    /// Worker idle-wait bound.
    pub idle_timeout: Duration,
    /// Longest a handler may run before it is aborted and counted as failed.
    pub handler_timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_path: ConfigPaths::default_store_file(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

impl StoreSettings {
    /// Default settings with the given store path.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ..Self::default()
        }
    }

    /// Replaces the worker idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Replaces the per-handler timeout.
    pub fn with_handler_timeout(mut self, handler_timeout: Duration) -> Self {
        self.handler_timeout = handler_timeout;
        self
    }
}
