use serde_json::Value;

use crate::{
    cli::{CliError, CommandResult, formatting::format_success},
    config_store::{ConfigStore, EntryInput},
};

/// Command for writing an agent's configuration from a raw JSON payload.
///
/// The payload must carry `prompt`, `tools` and `metadata`.
///
/// # Example Usage
///
/// ```bash
/// agentcfg import bot-1 '{"prompt": "hi", "tools": ["search"], "metadata": {}}'
/// ```
pub struct ImportCommand {
    config_store: ConfigStore,
}

impl ImportCommand {
    /// Creates a new ImportCommand with the provided config store.
    pub fn new(config_store: ConfigStore) -> Self {
        Self { config_store }
    }

    /// Parses `payload` and stores it under `key`.
    ///
    /// # Errors
    ///
    /// * `CliError::InvalidArguments` - If `payload` is not JSON
    /// * `CliError::Config` - If the payload shape or content is rejected
    pub fn execute(&self, key: &str, payload: &str) -> CommandResult {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| CliError::InvalidArguments(format!("Payload is not valid JSON: {e}")))?;

        let input = EntryInput::from_json(&value)?;
        let entry = self.config_store.update(key, input)?;

        Ok(format_success(&format!(
            "Imported '{key}' at {}",
            entry.updated_at.to_rfc3339()
        )))
    }
}
