//! Agent configuration commands.
mod delete;
mod dump;
mod get;
mod import;
mod list;
mod set;

pub use delete::DeleteCommand;
pub use dump::DumpCommand;
pub use get::GetCommand;
pub use import::ImportCommand;
pub use list::ListCommand;
pub use set::SetCommand;
