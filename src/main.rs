//! agentcfg - command-line front end for the agent configuration store.
//!
//! Every invocation starts the store, runs one command and stops the store,
//! so the final state is on disk before the process exits.

use std::{error::Error, process};

use agentcfg::{
    cli::{Cli, CliError, CliService, CommandResult, formatting::format_error},
    config::{ConfigPaths, StoreSettings},
    config_store::{ConfigStore, LoadOutcome},
    tracing_config,
};
use clap::Parser;
use tracing::{debug, instrument, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let log_guard = if cli.log_file {
        Some(tracing_config::init_with_file(&ConfigPaths::log_dir()?)?)
    } else {
        tracing_config::init()?;
        None
    };

    match run(cli).await {
        Ok(output) => {
            if !output.trim().is_empty() {
                println!("{output}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            drop(log_guard);
            process::exit(1);
        }
    }
}

/// Resolves settings, runs the command and always stops the store.
///
/// # Errors
/// Returns the command's error, or the final persistence error if the
/// command itself succeeded.
#[instrument(skip_all)]
async fn run(cli: Cli) -> CommandResult {
    let settings = StoreSettings::resolve(cli.settings.as_deref(), cli.store)?;
    let store = ConfigStore::from_settings(&settings);

    match store.start().await? {
        LoadOutcome::Failed(e) => warn!(error = %e, "Continuing with an empty store"),
        outcome => debug!(?outcome, "Store loaded"),
    }

    let result = CliService::new(store.clone()).execute(cli.command).await;
    let stopped = store.stop().await.map_err(CliError::from);

    let output = result?;
    stopped?;
    Ok(output)
}
