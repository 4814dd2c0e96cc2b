//! Persistent agent configuration store with change notifications.
//!
//! Entries live in memory and are mirrored to a single JSON file. Updates are
//! queued for one background worker that notifies subscribers and rewrites the
//! file atomically (temp file, then rename).

mod broadcast;
mod changes;
mod entry;
mod persistence;
mod store;
mod worker;

#[cfg(test)]
mod tests;

pub use broadcast::{ChangeHandler, HandlerError, Scope, Subscription, SubscriptionId};
pub use changes::{ConfigChange, ConfigError};
pub use entry::{ConfigEntry, EntryInput};
pub use persistence::{DurableFile, LoadOutcome, PersistenceStatus, Snapshot, StagedSnapshot};
pub use store::ConfigStore;
