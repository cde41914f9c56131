//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML) + optional secrets file
//!     → document.rs (parse into a mapping tree)
//!     → secrets.rs (substitute `!secret` references)
//!     → validation.rs (structural checks)
//!     → ConfigDocument (resolved, immutable)
//!     → shared via Arc to handlers and accessors
//!
//! While watching:
//!     watcher.rs polls fingerprint.rs stamps
//!     → loader.rs reloads on change
//!     → atomic swap of Arc<ConfigDocument>
//!     → handlers observe the new document
//! ```
//!
//! # Design Decisions
//! - Documents are immutable once published; changes require a full reload
//! - Every loader failure collapses to "no configuration", keeping the last
//!   good document in place
//! - Change detection is polling-based and strategy-agnostic

pub mod document;
pub mod error;
pub mod fingerprint;
pub mod loader;
pub mod schema;
pub mod secrets;
pub mod validation;
pub(crate) mod watcher;

pub use document::ConfigDocument;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{FingerprintKind, LoaderSettings, ManagerSettings, WatchSettings};
