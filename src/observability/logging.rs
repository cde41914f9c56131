//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global subscriber (stderr, optional log file)
//! - Read the `logging` section of a configuration document
//! - Apply level changes at runtime when the configuration reloads
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the document; when it is set, reloads leave the
//!   filter alone
//! - Unknown or non-string levels fall back to [`DEFAULT_LEVEL`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::config::ConfigDocument;
use crate::handlers::{ConfigHandler, HandlerError};

pub const DEFAULT_LEVEL: Level = Level::INFO;
pub const LOGGING_SECTION: &str = "logging";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log file path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to open log file: {0}")]
    File(#[from] tracing_appender::rolling::InitError),

    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// The `logging` section of a configuration document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level name such as `DEBUG` or `warning`. Kept untyped so a bad value
    /// degrades to the default instead of rejecting the document.
    pub level: Option<Value>,

    /// Optional log file, appended to alongside stderr output.
    pub file: Option<PathBuf>,
}

impl LoggingSettings {
    pub fn from_document(config: &ConfigDocument) -> Self {
        match config.section::<LoggingSettings>(LOGGING_SECTION) {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed logging section");
                Self::default()
            }
        }
    }

    pub fn level(&self) -> Level {
        self.level
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_level)
            .unwrap_or(DEFAULT_LEVEL)
    }
}

pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Some(Level::ERROR),
        _ => None,
    }
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

/// Keeps the log file writer alive and allows runtime level changes.
pub struct LoggingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
    _file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    /// A handler that applies the `logging.level` of every reloaded
    /// document. `None` when `RUST_LOG` controls filtering.
    pub fn level_handler(&self) -> Option<Arc<dyn ConfigHandler>> {
        if self.env_override {
            return None;
        }
        Some(Arc::new(LogLevelHandler {
            filter: self.filter.clone(),
        }))
    }
}

/// Install the global subscriber.
pub fn init(settings: &LoggingSettings) -> Result<LoggingHandle, LoggingError> {
    let (filter, env_override) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (level_filter(settings.level()), false),
    };
    let (filter_layer, filter) = reload::Layer::new(filter);

    let (file_layer, file_guard) = match &settings.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()?;

    Ok(LoggingHandle {
        filter,
        env_override,
        _file_guard: file_guard,
    })
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy().into_owned())
        .build(directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

struct LogLevelHandler {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl ConfigHandler for LogLevelHandler {
    fn on_config_change(&self, config: &Arc<ConfigDocument>) -> Result<(), HandlerError> {
        let level = LoggingSettings::from_document(config).level();
        self.filter.reload(level_filter(level))?;
        tracing::info!(level = %level, "Log level applied");
        Ok(())
    }

    fn name(&self) -> &str {
        "log-level"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    fn settings(yaml: &str) -> LoggingSettings {
        LoggingSettings::from_document(&ConfigDocument::from_yaml_str(yaml).unwrap())
    }

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(settings("logging:\n  level: DEBUG\n").level(), Level::DEBUG);
        assert_eq!(settings("logging:\n  level: warning\n").level(), Level::WARN);
        assert_eq!(settings("logging:\n  level: Error\n").level(), Level::ERROR);
    }

    #[test]
    fn bad_or_missing_levels_use_the_default() {
        assert_eq!(settings("logging: {}\n").level(), DEFAULT_LEVEL);
        assert_eq!(settings("logging:\n  level: _COOCOO_\n").level(), DEFAULT_LEVEL);
        assert_eq!(settings("logging:\n  level: 2.56\n").level(), DEFAULT_LEVEL);
        assert_eq!(settings("sources: {}\n").level(), DEFAULT_LEVEL);
    }

    #[test]
    fn file_is_read_from_the_section() {
        let s = settings("logging:\n  file: /var/log/hotconf.log\n");
        assert_eq!(s.file, Some(PathBuf::from("/var/log/hotconf.log")));
        assert!(settings("logging: not-a-mapping\n").file.is_none());
    }

    #[test]
    fn level_handler_reloads_the_filter() {
        let (layer, handle) = reload::Layer::new(level_filter(Level::INFO));
        let _subscriber = tracing_subscriber::registry().with(layer);

        let handler = LogLevelHandler {
            filter: handle.clone(),
        };
        let config = Arc::new(ConfigDocument::from_yaml_str("logging:\n  level: DEBUG\n").unwrap());
        handler.on_config_change(&config).unwrap();

        let current = handle.with_current(|f| f.to_string()).unwrap();
        assert!(current.to_lowercase().contains("debug"), "{current}");
    }
}
