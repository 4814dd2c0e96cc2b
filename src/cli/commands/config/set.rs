use crate::{
    cli::{
        CommandResult,
        formatting::{format_success, parse_meta},
    },
    config_store::{ConfigStore, EntryInput},
};

/// Command for writing an agent's configuration from flags.
///
/// # Example Usage
///
/// ```bash
/// agentcfg set bot-1 --prompt "You are helpful" --tool search --meta max_tokens=512
/// ```
pub struct SetCommand {
    config_store: ConfigStore,
}

impl SetCommand {
    /// Creates a new SetCommand with the provided config store.
    pub fn new(config_store: ConfigStore) -> Self {
        Self { config_store }
    }

    /// Replaces the entry for `key`.
    ///
    /// # Errors
    ///
    /// * `CliError::InvalidArguments` - If a `--meta` pair is malformed
    /// * `CliError::Config` - If the store rejects the entry
    pub fn execute(
        &self,
        key: &str,
        prompt: String,
        tools: Vec<String>,
        meta: &[String],
    ) -> CommandResult {
        let mut input = EntryInput {
            prompt,
            tools,
            ..EntryInput::default()
        };

        for raw in meta {
            let (field, value) = parse_meta(raw)?;
            input = input.with_metadata(field, value);
        }

        let entry = self.config_store.update(key, input)?;
        Ok(format_success(&format!(
            "Updated '{key}' at {}",
            entry.updated_at.to_rfc3339()
        )))
    }
}
