//! Settings for the configuration manager itself.
//!
//! These describe where documents live and how they are watched, not what
//! the documents contain. All fields have defaults so an empty settings
//! file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings for a [`ConfigManager`](crate::lifecycle::ConfigManager).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ManagerSettings {
    /// File names and validation rules.
    pub loader: LoaderSettings,

    /// Polling behaviour.
    pub watch: WatchSettings,
}

/// Where the loader looks and what it requires.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoaderSettings {
    /// Primary document, relative to the working directory.
    pub config_file: String,

    /// Optional secrets document, relative to the working directory.
    pub secrets_file: String,

    /// Section that must hold at least one entry. Empty disables the check.
    pub required_section: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            secrets_file: "secrets.yaml".to_string(),
            required_section: "pipelines".to_string(),
        }
    }
}

/// Watch loop tuning.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatchSettings {
    /// Delay between polls in milliseconds.
    pub poll_interval_ms: u64,

    /// How file changes are detected.
    pub fingerprint: FingerprintKind,
}

impl WatchSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            fingerprint: FingerprintKind::Metadata,
        }
    }
}

/// Change detection strategy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintKind {
    /// Modification time and size.
    #[default]
    Metadata,
    /// SHA-256 of the file contents.
    Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: ManagerSettings = toml::from_str(
            r#"
            [loader]
            config_file = "ambient.yaml"

            [watch]
            fingerprint = "content"
            "#,
        )
        .unwrap();

        assert_eq!(settings.loader.config_file, "ambient.yaml");
        assert_eq!(settings.loader.secrets_file, "secrets.yaml");
        assert_eq!(settings.loader.required_section, "pipelines");
        assert_eq!(settings.watch.poll_interval_ms, 500);
        assert_eq!(settings.watch.fingerprint, FingerprintKind::Content);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let watch = WatchSettings {
            poll_interval_ms: 0,
            ..WatchSettings::default()
        };
        assert_eq!(watch.poll_interval(), Duration::from_millis(1));
    }
}
