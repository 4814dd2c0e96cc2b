use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Errors raised while resolving store settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("I/O error on '{path}': {details}")]
    IoError {
        /// Path where I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// TOML parsing error with location context
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParseError {
        /// Location of TOML being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// A setting has an unusable value.
    #[error("invalid setting '{field}': {reason}")]
    InvalidValue {
        /// The offending setting.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A standard directory could not be determined.
    #[error("cannot resolve {what}: {details}")]
    PathResolution {
        /// Which directory was being resolved.
        what: &'static str,
        /// Why resolution failed.
        details: String,
    },
}

impl SettingsError {
    /// Creates a TOML parsing error with optional file path context.
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => p.to_string_lossy().to_string(),
            None => "string".to_string(),
        };

        SettingsError::TomlParseError {
            location,
            details: error.to_string(),
        }
    }
}
