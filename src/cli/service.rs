use tracing::{debug, instrument};

use crate::config_store::ConfigStore;

use super::{
    Command, CommandResult,
    commands::config::{
        DeleteCommand, DumpCommand, GetCommand, ImportCommand, ListCommand, SetCommand,
    },
};

/// Runs parsed CLI commands against a config store.
///
/// The store must already be started; the caller stops it afterwards.
pub struct CliService {
    config_store: ConfigStore,
}

impl CliService {
    /// Creates a new CLI service over `config_store`.
    pub fn new(config_store: ConfigStore) -> Self {
        Self { config_store }
    }

    /// Executes one command and returns the text to print.
    ///
    /// # Errors
    /// Returns the command's `CliError`.
    #[instrument(skip(self))]
    pub async fn execute(&self, command: Command) -> CommandResult {
        let store = self.config_store.clone();
        debug!("Executing command");

        match command {
            Command::List => ListCommand::new(store).execute(),
            Command::Get { key } => GetCommand::new(store).execute(&key),
            Command::Set {
                key,
                prompt,
                tools,
                meta,
            } => SetCommand::new(store).execute(&key, prompt, tools, &meta),
            Command::Import { key, payload } => ImportCommand::new(store).execute(&key, &payload),
            Command::Delete { key } => DeleteCommand::new(store).execute(&key).await,
            Command::Dump => DumpCommand::new(store).execute(),
        }
    }
}
