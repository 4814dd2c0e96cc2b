use crate::{
    cli::{CommandResult, formatting::format_success},
    config_store::ConfigStore,
};

/// Removes an agent's configuration.
pub struct DeleteCommand {
    config_store: ConfigStore,
}

impl DeleteCommand {
    /// Creates a new DeleteCommand with the provided config store.
    pub fn new(config_store: ConfigStore) -> Self {
        Self { config_store }
    }

    /// Deletes the entry for `key`. The file is rewritten before this returns.
    ///
    /// # Errors
    ///
    /// * `CliError::Config` - If no entry exists for `key`
    pub async fn execute(&self, key: &str) -> CommandResult {
        self.config_store.delete(key).await?;
        Ok(format_success(&format!("Deleted '{key}'")))
    }
}
