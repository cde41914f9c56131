//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigManager::load(dir):
//!     store.rs → loader → publish current config (no dispatch)
//!
//! ConfigManager::start(dir):
//!     spawn config::watcher loop
//!     → poll fingerprint → reload on change → publish → dispatch handlers
//!
//! ConfigManager::stop():
//!     shutdown.rs trigger → join loop → clear watch state
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary stops the manager and exits
//! ```
//!
//! # Design Decisions
//! - No global state: every manager owns its config, handlers and loop
//! - `stop` waits for the loop, so "stopped" means no further callbacks
//! - Only the loop dispatches, so handlers never run concurrently

pub mod manager;
pub mod shutdown;
pub mod signals;
pub(crate) mod store;

pub use manager::ConfigManager;
pub use shutdown::Shutdown;
