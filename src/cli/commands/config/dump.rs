use crate::{cli::CommandResult, config_store::ConfigStore};

/// Prints the whole mapping as pretty JSON, in the durable file's format.
pub struct DumpCommand {
    config_store: ConfigStore,
}

impl DumpCommand {
    /// Creates a new DumpCommand with the provided config store.
    pub fn new(config_store: ConfigStore) -> Self {
        Self { config_store }
    }

    /// Serializes every entry.
    ///
    /// # Errors
    ///
    /// * `CliError::Serialization` - If the mapping cannot be encoded
    pub fn execute(&self) -> CommandResult {
        Ok(serde_json::to_string_pretty(&self.config_store.entries())?)
    }
}
