//! Command-line interface for agent configuration management.
//!
//! Arguments are parsed with clap into a `Command`, which `CliService`
//! runs against a started `ConfigStore`. Each command lives in its own
//! module under `commands`.

mod args;
mod commands;
pub mod formatting;
mod service;
mod types;


pub use args::{Cli, Command};
pub use service::CliService;
pub use types::{CliError, CommandResult};
