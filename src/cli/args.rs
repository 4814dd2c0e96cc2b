use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments for `agentcfg`.
#[derive(Parser, Debug)]
#[command(name = "agentcfg", version)]
#[command(about = "Manage persistent agent configurations (prompts, tools, metadata)")]
pub struct Cli {
    /// Path of the JSON store file. Overrides settings and environment.
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// TOML settings file to use instead of the default location.
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Also write logs to a daily-rolling file in the state directory.
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Store commands. Each runs against a freshly started store that is
/// stopped, and so fully persisted, before the process exits.
#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List stored agent ids
    List,
    /// Show one agent's configuration
    Get {
        /// Agent id
        key: String,
    },
    /// Replace an agent's configuration from flags
    Set {
        /// Agent id
        key: String,
        /// Instruction prompt
        #[arg(long)]
        prompt: String,
        /// Tool id, repeatable and kept in order
        #[arg(long = "tool", value_name = "TOOL")]
        tools: Vec<String>,
        /// Metadata field as KEY=VALUE, repeatable. VALUE is JSON or a plain string.
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },
    /// Replace an agent's configuration from a JSON payload
    Import {
        /// Agent id
        key: String,
        /// Object with `prompt`, `tools` and `metadata`
        payload: String,
    },
    /// Remove an agent's configuration
    Delete {
        /// Agent id
        key: String,
    },
    /// Print every entry as JSON
    Dump,
}
