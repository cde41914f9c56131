//! Ordered, duplicate-free handler set.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ConfigDocument;
use crate::handlers::ConfigHandler;
use crate::observability::metrics;

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<Vec<Arc<dyn ConfigHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` unless the same allocation is already registered.
    ///
    /// Returns `true` if the registry changed.
    pub fn register(&self, handler: Arc<dyn ConfigHandler>) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        tracing::debug!(handler = handler.name(), "Config handler registered");
        handlers.push(handler);
        metrics::record_handler_count(handlers.len());
        true
    }

    /// Remove `handler` if present. Returns `true` if the registry changed.
    pub fn unregister(&self, handler: &Arc<dyn ConfigHandler>) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|h| !same_handler(h, handler));
        metrics::record_handler_count(handlers.len());
        handlers.len() != before
    }

    pub fn contains(&self, handler: &Arc<dyn ConfigHandler>) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|h| same_handler(h, handler))
    }

    pub fn count(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).clear();
        metrics::record_handler_count(0);
    }

    /// Call every handler, in registration order, with `config`.
    ///
    /// The handler list is copied before the first call, so handlers may
    /// register or unregister others without deadlocking; such changes take
    /// effect on the next dispatch.
    pub fn dispatch(&self, config: &Arc<ConfigDocument>) -> DispatchReport {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner).clone();
        let mut report = DispatchReport::default();

        for handler in handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.on_config_change(config)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(handler = handler.name(), error = %e, "Config handler failed");
                    metrics::record_handler_failure(handler.name());
                    report.failed += 1;
                }
                Err(payload) => {
                    tracing::error!(
                        handler = handler.name(),
                        panic = panic_message(payload.as_ref()),
                        "Config handler panicked"
                    );
                    metrics::record_handler_failure(handler.name());
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("count", &self.count())
            .finish()
    }
}

// Compare data pointers only; vtable pointers for the same type may differ
// between codegen units.
fn same_handler(a: &Arc<dyn ConfigHandler>, b: &Arc<dyn ConfigHandler>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
