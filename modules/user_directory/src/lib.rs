//! Client for a REST user directory.
//!
//! The [`contract`] module is the stable surface: the user model, the closed
//! error taxonomy and the [`UserDirectoryApi`] trait. [`RestUserDirectory`] is
//! the HTTP implementation of that trait.

// === PUBLIC CONTRACT ===
pub mod contract;

pub use contract::{client, error, model};
pub use contract::client::UserDirectoryApi;
pub use contract::error::{ErrorKind, UserDirectoryError};
pub use contract::model::{User, UserFields, UserId};

// === CONFIGURATION ===
pub mod config;
pub use config::UserDirectoryConfig;

// === ADAPTERS ===
pub mod infra;
pub use infra::http::TracedClient;
pub use infra::rest::RestUserDirectory;

/// Name of the configuration section consumed by this module.
pub const MODULE_NAME: &str = "user_directory";
