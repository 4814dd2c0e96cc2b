use crate::{
    cli::{CommandResult, formatting::format_description},
    config_store::ConfigStore,
};

/// Lists stored agent ids, one per line, sorted.
pub struct ListCommand {
    config_store: ConfigStore,
}

impl ListCommand {
    /// Creates a new ListCommand with the provided config store.
    pub fn new(config_store: ConfigStore) -> Self {
        Self { config_store }
    }

    /// Returns the sorted key list, or a note when the store is empty.
    pub fn execute(&self) -> CommandResult {
        let keys = self.config_store.list_keys();

        if keys.is_empty() {
            return Ok(format_description("No agent configurations stored"));
        }

        Ok(keys.join("\n"))
    }
}
