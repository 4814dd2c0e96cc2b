use std::{path::PathBuf, time::Instant};

use serde_json::Value;

use super::ConfigEntry;

/// A change to a single agent's configuration entry.
///
/// Produced by `update` and `delete`, queued for the background worker and
/// handed to every matching subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    /// The agent id whose entry changed.
    pub key: String,
    /// The entry before the change, if there was one.
    pub previous: Option<ConfigEntry>,
    /// The entry after the change. `None` when the entry was removed.
    pub current: Option<ConfigEntry>,
    /// When the change was accepted by the store.
    pub timestamp: Instant,
}

/// Errors that can occur during configuration store operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No entry exists for the requested key.
    #[error("agent '{0}' not found")]
    NotFound(String),

    /// The update payload is malformed and was rejected before any mutation.
    #[error("invalid field '{field}': {reason}")]
    Validation {
        /// The offending field of the payload.
        field: String,
        /// Why the field was rejected.
        reason: String,
    },

    /// Writing or renaming the durable file failed.
    #[error("failed to persist config to '{path}': {details}")]
    PersistenceError {
        /// Path where persistence failed
        path: PathBuf,
        /// Error details from the persistence operation
        details: String,
    },

    /// The durable file could not be read or parsed at startup.
    #[error("failed to load config from '{path}': {details}")]
    LoadError {
        /// Path of the durable file
        path: PathBuf,
        /// Read or parse error details
        details: String,
    },

    /// Error occurred while serializing configuration
    #[error("failed to serialize {content_type}: {details}")]
    SerializationError {
        /// Type of content being serialized
        content_type: String,
        /// Serialization error details
        details: String,
    },

    /// A metadata value does not have the requested type.
    #[error("type mismatch at {key}.{field}: expected {expected_type}, got {actual_value}")]
    TypeMismatch {
        /// The agent id.
        key: String,
        /// The metadata field.
        field: String,
        /// The expected type name.
        expected_type: &'static str,
        /// The actual value stored.
        actual_value: Value,
    },

    /// A metadata field is absent from the entry.
    #[error("metadata field '{field}' not present for agent '{key}'")]
    InvalidField {
        /// The agent id.
        key: String,
        /// The missing field.
        field: String,
    },

    /// Error occurred while acquiring locks for thread-safe access
    #[error("failed to acquire {lock_type} lock: {details}")]
    LockError {
        /// Type of lock that failed (read, write)
        lock_type: String,
        /// Lock error details
        details: String,
    },

    /// `start` was called on a store that is already running.
    #[error("config store already started")]
    AlreadyStarted,

    /// The store has not been started, or has been stopped.
    #[error("config store is not running")]
    NotRunning,
}

impl ConfigError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl ConfigChange {
    /// Creates a new configuration change stamped with the current instant.
    pub fn new(key: String, previous: Option<ConfigEntry>, current: Option<ConfigEntry>) -> Self {
        Self {
            key,
            previous,
            current,
            timestamp: Instant::now(),
        }
    }

    /// Returns true if this change removed the entry.
    pub fn is_removal(&self) -> bool {
        self.current.is_none()
    }

    /// Extracts a metadata field of the new entry as a specific type.
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidField` - the change is a removal or the field is absent
    /// * `ConfigError::TypeMismatch` - the value cannot be deserialized into `T`
    pub fn metadata_value<T>(&self, field: &str) -> Result<T, ConfigError>
    where
        T: serde::de::DeserializeOwned,
    {
        let missing = || ConfigError::InvalidField {
            key: self.key.clone(),
            field: field.to_string(),
        };

        let value = self
            .current
            .as_ref()
            .and_then(|entry| entry.metadata.get(field))
            .ok_or_else(missing)?;

        serde_json::from_value(value.clone()).map_err(|_| ConfigError::TypeMismatch {
            key: self.key.clone(),
            field: field.to_string(),
            expected_type: std::any::type_name::<T>(),
            actual_value: value.clone(),
        })
    }
}
