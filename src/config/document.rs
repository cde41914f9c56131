//! In-memory configuration documents.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::config::error::ConfigError;

/// Well-known top-level sections.
pub const SOURCES_SECTION: &str = "sources";
pub const AI_MODELS_SECTION: &str = "ai_models";
pub const PIPELINES_SECTION: &str = "pipelines";
pub const DATA_DIR_KEY: &str = "data_dir";

/// A parsed configuration tree whose root is always a mapping.
///
/// Documents are shared behind an `Arc` once published and are never
/// mutated afterwards. A reload produces a new document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Mapping,
}

impl ConfigDocument {
    pub fn new(root: Mapping) -> Self {
        Self { root }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(contents)?;
        Self::from_value(value)
    }

    /// Parse a TOML document into the same tree shape YAML produces.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let value: toml::Value = toml::from_str(contents)?;
        Self::from_value(serde_yaml::to_value(value)?)
    }

    /// Read and parse `path`, choosing the format from its extension.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yml" | "yaml" => Self::from_yaml_str(&contents),
            "toml" => Self::from_toml_str(&contents),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Err(ConfigError::Validation("document is empty".into())),
            _ => Err(ConfigError::Validation(
                "document root must be a mapping".into(),
            )),
        }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Top-level value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Follow a dotted path (`sources.front_door_camera.uri`) through
    /// nested mappings.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.root, path)
    }

    /// Deserialize one top-level section into a typed value.
    ///
    /// Returns `Ok(None)` when the section is absent.
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.root.get(key) {
            Some(value) => Ok(Some(serde_yaml::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Entry `id` of a section.
    ///
    /// Mapping sections are keyed by id; sequence sections are searched for
    /// an element whose `id` field matches.
    pub fn entry(&self, section: &str, id: &str) -> Option<&Value> {
        match self.root.get(section)? {
            Value::Mapping(entries) => entries.get(id),
            Value::Sequence(entries) => entries
                .iter()
                .find(|entry| entry.get("id").and_then(Value::as_str) == Some(id)),
            _ => None,
        }
    }

    /// Number of entries in a mapping or sequence section.
    pub fn section_len(&self, section: &str) -> usize {
        match self.root.get(section) {
            Some(Value::Mapping(entries)) => entries.len(),
            Some(Value::Sequence(entries)) => entries.len(),
            _ => 0,
        }
    }

    pub fn sources(&self) -> Option<&Value> {
        self.get(SOURCES_SECTION)
    }

    pub fn ai_models(&self) -> Option<&Value> {
        self.get(AI_MODELS_SECTION)
    }

    pub fn pipelines(&self) -> Option<&Value> {
        self.get(PIPELINES_SECTION)
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.get(DATA_DIR_KEY)
            .and_then(Value::as_str)
            .map(PathBuf::from)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// Write the document as YAML.
    ///
    /// The file is written next to `path` and renamed into place so a
    /// concurrent reader never observes a half-written document.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_yaml_string()?;

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, contents).map_err(|e| ConfigError::io(&staging, e))?;
        fs::rename(&staging, path).map_err(|e| ConfigError::io(path, e))
    }
}

impl From<Mapping> for ConfigDocument {
    fn from(root: Mapping) -> Self {
        Self::new(root)
    }
}

pub(crate) fn lookup_path<'a>(root: &'a Mapping, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_mapping()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
data_dir: ./data
sources:
  front_door_camera:
    uri: rtsp://camera/stream
ai_models:
  - id: image_detection
    labels: coco_labels.txt
pipelines:
  front_door_watch:
    - source: front_door_camera
"#;

    #[test]
    fn lookup_follows_nested_mappings() {
        let doc = ConfigDocument::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            doc.lookup("sources.front_door_camera.uri").and_then(Value::as_str),
            Some("rtsp://camera/stream")
        );
        assert!(doc.lookup("sources.back_door.uri").is_none());
        assert!(doc.lookup("data_dir.nested").is_none());
    }

    #[test]
    fn entries_are_found_in_mappings_and_sequences() {
        let doc = ConfigDocument::from_yaml_str(SAMPLE).unwrap();
        assert!(doc.entry(SOURCES_SECTION, "front_door_camera").is_some());
        assert!(doc.entry(AI_MODELS_SECTION, "image_detection").is_some());
        assert!(doc.entry(AI_MODELS_SECTION, "face_detection").is_none());
        assert!(doc.entry(DATA_DIR_KEY, "anything").is_none());
        assert_eq!(doc.section_len(PIPELINES_SECTION), 1);
        assert_eq!(doc.data_dir(), Some(PathBuf::from("./data")));
    }

    #[test]
    fn typed_sections_deserialize() {
        #[derive(Debug, Deserialize)]
        struct Source {
            uri: String,
        }

        let doc = ConfigDocument::from_yaml_str(SAMPLE).unwrap();
        let sources: std::collections::BTreeMap<String, Source> =
            doc.section(SOURCES_SECTION).unwrap().unwrap();
        assert_eq!(sources["front_door_camera"].uri, "rtsp://camera/stream");

        let missing: Option<Source> = doc.section("logging").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn non_mapping_roots_are_rejected() {
        assert!(matches!(
            ConfigDocument::from_yaml_str(""),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            ConfigDocument::from_yaml_str("- a\n- b\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            ConfigDocument::from_yaml_str("sources: [unclosed"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn toml_documents_share_the_tree_shape() {
        let doc = ConfigDocument::from_toml_str(
            r#"
            data_dir = "./data"

            [sources.front_door_camera]
            uri = "rtsp://camera/stream"
            "#,
        )
        .unwrap();
        assert_eq!(
            doc.lookup("sources.front_door_camera.uri").and_then(Value::as_str),
            Some("rtsp://camera/stream")
        );
    }

    #[test]
    fn save_then_read_preserves_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let doc = ConfigDocument::from_yaml_str(SAMPLE).unwrap();
        doc.save(&path).unwrap();

        assert_eq!(ConfigDocument::read(&path).unwrap(), doc);
        assert!(!dir.path().join("config.yaml.tmp").exists());
    }

    #[test]
    fn read_rejects_unknown_extensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "a = 1").unwrap();

        assert!(matches!(
            ConfigDocument::read(&path),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
        assert!(matches!(
            ConfigDocument::read(&dir.path().join("missing.yaml")),
            Err(ConfigError::NotFound(_))
        ));
    }
}
