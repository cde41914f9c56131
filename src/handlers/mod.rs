//! Configuration change observers.
//!
//! # Data Flow
//! ```text
//! watch loop publishes a new document
//!     → registry.rs snapshots the registered handlers
//!     → each handler is called in registration order
//!     → failures are logged and counted, never propagated
//! ```
//!
//! # Design Decisions
//! - Handler identity is the `Arc` allocation; registering twice is a no-op
//! - Dispatch works on a snapshot, so a handler registered mid-dispatch
//!   only sees the next reload
//! - Panics are contained per handler

pub mod handler;
pub mod registry;

pub use handler::{ConfigHandler, HandlerError};
pub use registry::{DispatchReport, HandlerRegistry};
