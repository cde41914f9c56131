//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::secrets::SecretError;

/// Everything that can stop a directory from producing a configuration.
///
/// The loader reports these to its caller through [`ConfigLoader::try_load`];
/// [`ConfigLoader::load`] collapses all of them into "no configuration".
///
/// [`ConfigLoader::try_load`]: crate::config::ConfigLoader::try_load
/// [`ConfigLoader::load`]: crate::config::ConfigLoader::load
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config extension: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("unresolved secret references: {}", .0.join(", "))]
    Unresolved(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path)
        } else {
            ConfigError::Io { path, source }
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "missing",
            ConfigError::Io { .. } => "io",
            ConfigError::Yaml(_) | ConfigError::Toml(_) | ConfigError::UnsupportedFormat(_) => {
                "parse"
            }
            ConfigError::Secret(_) | ConfigError::Unresolved(_) => "secret",
            ConfigError::Validation(_) => "invalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_io_errors_are_classified_as_missing() {
        let err = ConfigError::io(
            "/nope/config.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert_eq!(err.kind(), "missing");
        assert_eq!(err.to_string(), "configuration file not found: /nope/config.yaml");

        let err = ConfigError::io(
            "/etc/config.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().starts_with("failed to access /etc/config.yaml"));
    }

    #[test]
    fn unresolved_lists_every_key() {
        let err = ConfigError::Unresolved(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "unresolved secret references: a, b");
        assert_eq!(err.kind(), "secret");
    }
}
