//! Live configuration management.
//!
//! Loads a YAML (or TOML) configuration document from a working directory,
//! resolves `!secret` references from an optional secrets document, polls
//! for on-disk changes and notifies registered handlers with each new
//! configuration.

pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod observability;

pub use config::{ConfigDocument, ConfigError, ConfigLoader, ManagerSettings};
pub use handlers::{ConfigHandler, HandlerError};
pub use lifecycle::ConfigManager;
