//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! loader, watch loop, handler registry produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (reload and handler counters)
//!
//! The `logging` section of each reloaded document:
//!     → logging.rs level handler → live filter swap
//! ```
//!
//! # Design Decisions
//! - Structured fields (`directory`, `handler`, `error`) over formatted text
//! - Metrics are cheap and recorder-agnostic; the binary decides whether to
//!   export them

pub mod logging;
pub mod metrics;
