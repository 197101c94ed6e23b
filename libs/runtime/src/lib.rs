//! Shared process plumbing: layered configuration and logging setup.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{default_logging_config, AppConfig, CliArgs, ClientConfig, LoggingConfig, Section};

/// Serialises tests that read or mutate process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
