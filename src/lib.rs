//! agentcfg - persistent, change-notifying configuration store for agents.
//!
//! Each agent id maps to a prompt, an ordered tool list and free-form
//! metadata. The store keeps the mapping in memory, mirrors it to a single
//! JSON file with atomic replace, and notifies subscribers of every change
//! from one background worker.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use agentcfg::config_store::{ConfigStore, EntryInput, Scope};
//!
//! # async fn demo() -> Result<(), agentcfg::config_store::ConfigError> {
//! let store = ConfigStore::new("agent_configs.json");
//! store.start().await?;
//!
//! let mut changes = store.watch(Scope::exact("bot-1"));
//! store.update("bot-1", EntryInput::new("You are helpful").with_tool("search"))?;
//!
//! if let Some(change) = changes.recv().await {
//!     println!("{} changed", change.key);
//! }
//!
//! store.stop().await?;
//! # Ok(())
//! # }
//! ```

/// Store settings, paths and their resolution.
pub mod config;

/// Persistent agent configuration store with change notifications.
pub mod config_store;

/// Command-line interface for configuration management.
pub mod cli;

/// Logging setup shared by the binary.
pub mod tracing_config;
