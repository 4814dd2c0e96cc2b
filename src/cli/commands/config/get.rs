use crate::{
    cli::{CommandResult, formatting::format_entry},
    config_store::{ConfigError, ConfigStore},
};

/// Command for showing one agent's configuration.
///
/// # Example Usage
///
/// ```bash
/// agentcfg get bot-1
/// ```
pub struct GetCommand {
    config_store: ConfigStore,
}

impl GetCommand {
    /// Creates a new GetCommand with the provided config store.
    pub fn new(config_store: ConfigStore) -> Self {
        Self { config_store }
    }

    /// Formats the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// * `CliError::Config` - If no entry exists for `key`
    pub fn execute(&self, key: &str) -> CommandResult {
        let entry = self
            .config_store
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;

        Ok(format_entry(key, &entry))
    }
}
