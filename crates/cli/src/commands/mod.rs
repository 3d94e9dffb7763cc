//! Command handlers for the Explainer CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod check;
pub mod hash_password;
pub mod index;
pub mod logs;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use check::CheckCommand;
pub use hash_password::HashPasswordCommand;
pub use index::IndexCommand;
pub use logs::LogsCommand;
