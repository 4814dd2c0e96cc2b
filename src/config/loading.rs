use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{ConfigPaths, SettingsError, StoreSettings};

/// Environment variable overriding the store path.
pub const ENV_STORE_PATH: &str = "AGENTCFG_STORE_PATH";

/// Environment variable overriding the worker idle timeout, in milliseconds.
pub const ENV_IDLE_TIMEOUT_MS: &str = "AGENTCFG_IDLE_TIMEOUT_MS";

/// Environment variable overriding the per-handler timeout, in milliseconds.
pub const ENV_HANDLER_TIMEOUT_MS: &str = "AGENTCFG_HANDLER_TIMEOUT_MS";

/// On-disk shape of the settings file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    store_path: Option<PathBuf>,
    idle_timeout_ms: Option<u64>,
    handler_timeout_ms: Option<u64>,
}

impl StoreSettings {
    /// Resolves settings from every source.
    ///
    /// Order, later wins: defaults, the settings file (`settings_file` if
    /// given, otherwise the XDG one if it exists), environment, then
    /// `store_override`.
    ///
    /// # Errors
    /// Returns an error if an explicit settings file is missing, any settings
    /// file is invalid, or an environment value is unusable.
    #[instrument]
    pub fn resolve(
        settings_file: Option<&Path>,
        store_override: Option<PathBuf>,
    ) -> Result<Self, SettingsError> {
        let mut settings = match settings_file {
            Some(path) => Self::load_file(path)?,
            None => match ConfigPaths::settings_file() {
                Ok(path) if path.exists() => Self::load_file(&path)?,
                _ => Self::default(),
            },
        };

        settings = settings.apply_env(|name| env::var(name).ok())?;

        if let Some(path) = store_override {
            debug!(path = %path.display(), "Store path overridden on command line");
            settings.store_path = path;
        }

        info!(
            store_path = %settings.store_path.display(),
            idle_timeout = ?settings.idle_timeout,
            handler_timeout = ?settings.handler_timeout,
            "Resolved store settings"
        );
        Ok(settings)
    }

    /// Reads a TOML settings file on top of the defaults.
    ///
    /// # Errors
    /// Returns `SettingsError::IoError` if the file cannot be read, or the
    /// parse/validation errors of `from_toml_str`.
    pub fn load_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|e| SettingsError::IoError {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        Self::from_toml(&content, Some(path))
    }

    /// Parses TOML settings text on top of the defaults.
    ///
    /// # Errors
    /// Returns `SettingsError::TomlParseError` for malformed TOML or unknown
    /// keys, `SettingsError::InvalidValue` for a zero timeout.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Self::from_toml(content, None)
    }

    /// Applies environment overrides, looking variables up with `lookup`.
    ///
    /// # Errors
    /// Returns `SettingsError::InvalidValue` if a variable is set but unusable.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_STORE_PATH) {
            if path.trim().is_empty() {
                return Err(SettingsError::InvalidValue {
                    field: ENV_STORE_PATH.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            self.store_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(ENV_IDLE_TIMEOUT_MS) {
            self.idle_timeout = env_millis(ENV_IDLE_TIMEOUT_MS, &raw)?;
        }

        if let Some(raw) = lookup(ENV_HANDLER_TIMEOUT_MS) {
            self.handler_timeout = env_millis(ENV_HANDLER_TIMEOUT_MS, &raw)?;
        }

        Ok(self)
    }

    fn from_toml(content: &str, path: Option<&Path>) -> Result<Self, SettingsError> {
        let file: SettingsFile =
            toml::from_str(content).map_err(|e| SettingsError::toml_parse(e, path))?;

        let mut settings = Self::default();

        if let Some(store_path) = file.store_path {
            settings.store_path = store_path;
        }

        if let Some(millis) = file.idle_timeout_ms {
            settings.idle_timeout = positive_millis("idle_timeout_ms", millis)?;
        }

        if let Some(millis) = file.handler_timeout_ms {
            settings.handler_timeout = positive_millis("handler_timeout_ms", millis)?;
        }

        Ok(settings)
    }
}

fn env_millis(field: &str, raw: &str) -> Result<Duration, SettingsError> {
    let millis = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| SettingsError::InvalidValue {
            field: field.to_string(),
            reason: e.to_string(),
        })?;

    positive_millis(field, millis)
}

fn positive_millis(field: &str, millis: u64) -> Result<Duration, SettingsError> {
    if millis == 0 {
        return Err(SettingsError::InvalidValue {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(Duration::from_millis(millis))
}
