use thiserror::Error;

use crate::{config::SettingsError, config_store::ConfigError};

/// Errors that can occur during CLI command execution.
///
/// Wraps the store and settings errors so `main` can report any failure
/// the same way.
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid arguments were provided to a command.
    ///
    /// Returned when an argument parses but cannot be used, such as a
    /// metadata pair without `=` or a payload that is not JSON.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// An error occurred in the configuration store.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store settings could not be resolved.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for command execution results.
///
/// All CLI commands return this type, providing either the text to print
/// on success or a CliError describing what went wrong.
pub type CommandResult = Result<String, CliError>;
