//! Configuration loading from disk.

use std::path::{Path, PathBuf};

use crate::config::document::ConfigDocument;
use crate::config::error::ConfigError;
use crate::config::schema::LoaderSettings;
use crate::config::secrets;
use crate::config::validation::validate;

/// Reads the primary document and optional secrets document from a
/// working directory and produces a resolved, validated configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    settings: LoaderSettings,
}

impl ConfigLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn config_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.settings.config_file)
    }

    pub fn secrets_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.settings.secrets_file)
    }

    /// Files whose changes should trigger a reload.
    pub fn watched_paths(&self, directory: &Path) -> Vec<PathBuf> {
        vec![self.config_path(directory), self.secrets_path(directory)]
    }

    /// Load, resolve and validate the configuration in `directory`.
    pub fn try_load(&self, directory: &Path) -> Result<ConfigDocument, ConfigError> {
        let raw = ConfigDocument::read(&self.config_path(directory))?;
        let secrets = self.load_secrets(directory)?;

        let resolution = secrets::resolve(&raw, secrets.as_ref())?;
        if !resolution.is_complete() {
            return Err(ConfigError::Unresolved(
                resolution.unresolved.into_iter().map(|r| r.key).collect(),
            ));
        }

        validate(&resolution.document, &self.settings.required_section)?;
        Ok(resolution.document)
    }

    /// Like [`try_load`](Self::try_load), but every failure becomes `None`
    /// after being logged.
    pub fn load(&self, directory: &Path) -> Option<ConfigDocument> {
        match self.try_load(directory) {
            Ok(config) => {
                tracing::debug!(directory = %directory.display(), "Configuration loaded");
                Some(config)
            }
            Err(ConfigError::NotFound(path)) => {
                tracing::info!(path = %path.display(), "No configuration file found");
                None
            }
            Err(e) => {
                tracing::warn!(
                    directory = %directory.display(),
                    kind = e.kind(),
                    error = %e,
                    "Configuration rejected"
                );
                None
            }
        }
    }

    /// A missing secrets file is not an error; an unreadable or malformed
    /// one is.
    fn load_secrets(&self, directory: &Path) -> Result<Option<ConfigDocument>, ConfigError> {
        match ConfigDocument::read(&self.secrets_path(directory)) {
            Ok(secrets) => Ok(Some(secrets)),
            Err(ConfigError::NotFound(path)) => {
                tracing::debug!(path = %path.display(), "No secrets file");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
logging:
  level: DEBUG
sources:
  front_door_camera:
    uri: !secret front_door_camera_uri
pipelines:
  front_door_watch:
    - source: front_door_camera
"#;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn missing_config_is_not_found() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::default();
        assert!(matches!(
            loader.try_load(dir.path()),
            Err(ConfigError::NotFound(_))
        ));
        assert!(loader.load(dir.path()).is_none());
    }

    #[test]
    fn secrets_are_resolved_into_the_config() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.yaml", CONFIG);
        write(&dir, "secrets.yaml", "front_door_camera_uri: secret_uri\n");

        let config = ConfigLoader::default().try_load(dir.path()).unwrap();
        assert_eq!(
            config.lookup("sources.front_door_camera.uri").and_then(Value::as_str),
            Some("secret_uri")
        );
    }

    #[test]
    fn reference_without_secrets_file_is_unresolved() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.yaml", CONFIG);

        let err = ConfigLoader::default().try_load(dir.path()).unwrap_err();
        assert!(
            matches!(&err, ConfigError::Unresolved(keys) if keys == &["front_door_camera_uri"]),
            "{err}"
        );
    }

    #[test]
    fn malformed_secrets_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.yaml", CONFIG);
        write(&dir, "secrets.yaml", "front_door_camera_uri: [unclosed\n");

        assert!(matches!(
            ConfigLoader::default().try_load(dir.path()),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn custom_file_names_are_honoured() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "ambient.toml",
            "[sources.cam]\nuri = \"!secret cam_uri\"\n[pipelines.watch]\nsource = \"cam\"\n",
        );
        write(&dir, "vault.yaml", "cam_uri: rtsp://hidden\n");

        let loader = ConfigLoader::new(LoaderSettings {
            config_file: "ambient.toml".into(),
            secrets_file: "vault.yaml".into(),
            ..LoaderSettings::default()
        });
        let config = loader.try_load(dir.path()).unwrap();
        assert_eq!(
            config.lookup("sources.cam.uri").and_then(Value::as_str),
            Some("rtsp://hidden")
        );
        assert_eq!(
            loader.watched_paths(dir.path()),
            vec![dir.path().join("ambient.toml"), dir.path().join("vault.yaml")]
        );
    }
}
