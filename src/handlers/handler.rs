use std::sync::Arc;

use crate::config::ConfigDocument;

/// Error returned by a handler. Logged by the registry and otherwise ignored.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Observer notified with every successfully reloaded configuration.
///
/// Handlers run on the watch loop's task, one at a time, so a slow handler
/// delays the next poll.
pub trait ConfigHandler: Send + Sync {
    fn on_config_change(&self, config: &Arc<ConfigDocument>) -> Result<(), HandlerError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> ConfigHandler for F
where
    F: Fn(&Arc<ConfigDocument>) -> Result<(), HandlerError> + Send + Sync,
{
    fn on_config_change(&self, config: &Arc<ConfigDocument>) -> Result<(), HandlerError> {
        self(config)
    }
}
