use std::{env, path::PathBuf};

use super::SettingsError;

const APP_DIR: &str = "agentcfg";

/// Default name of the durable store file, relative to the working directory.
pub const DEFAULT_STORE_FILE: &str = "agent_configs.json";

/// Locations of the files agentcfg reads and writes.
///
/// Follows the XDG Base Directory specification for the optional settings
/// file and the log directory. The store file itself defaults to the
/// working directory.
pub struct ConfigPaths;

impl ConfigPaths {
    /// Default durable store path.
    pub fn default_store_file() -> PathBuf {
        PathBuf::from(DEFAULT_STORE_FILE)
    }

    /// Returns the configuration directory path for the application
    ///
    /// - First checks `XDG_CONFIG_HOME`
    /// - Falls back to `$HOME/.config`
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` is set
    pub fn config_dir() -> Result<PathBuf, SettingsError> {
        Self::xdg_dir("XDG_CONFIG_HOME", ".config", "config directory")
    }

    /// Path of the optional TOML settings file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined
    pub fn settings_file() -> Result<PathBuf, SettingsError> {
        Ok(Self::config_dir()?.join("settings.toml"))
    }

    /// Directory for rolling log files.
    ///
    /// - First checks `XDG_STATE_HOME`
    /// - Falls back to `$HOME/.local/state`
    ///
    /// # Errors
    /// Returns an error if neither `XDG_STATE_HOME` nor `HOME` is set
    pub fn log_dir() -> Result<PathBuf, SettingsError> {
        Ok(Self::xdg_dir("XDG_STATE_HOME", ".local/state", "log directory")?.join("logs"))
    }

    fn xdg_dir(
        var: &str,
        home_fallback: &str,
        what: &'static str,
    ) -> Result<PathBuf, SettingsError> {
        let base = env::var(var)
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/{home_fallback}")))
            .map_err(|_| SettingsError::PathResolution {
                what,
                details: format!("neither {var} nor HOME environment variable found"),
            })?;

        Ok(PathBuf::from(base).join(APP_DIR))
    }
}
