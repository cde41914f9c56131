//! Shared fixtures for integration tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hotconf::{ConfigDocument, ConfigHandler, ConfigManager, HandlerError, ManagerSettings};
use tokio::sync::mpsc;

pub const POLL_MS: u64 = 25;

/// Config with a secret reference, in the shape the camera pipeline uses.
pub const CONFIG_WITH_SECRET: &str = r#"
logging:
  level: DEBUG
data_dir: ./data
sources:
  front_door_camera:
    uri: !secret front_door_camera_uri
    type: video
ai_models:
  image_detection:
    model:
      tflite: ai_models/mobilenet_ssd_v2_coco_quant_postprocess.tflite
    labels: ai_models/coco_labels.txt
pipelines:
  front_door_watch:
    - source: front_door_camera
    - detect_objects:
        ai_model: image_detection
        confidence_threshold: 0.6
"#;

pub const SECRETS: &str = "front_door_camera_uri: secret_uri\n";

/// Same shape, literal uri, no secret reference.
pub const CONFIG_WITHOUT_SECRET: &str = r#"
logging:
  level: DEBUG
data_dir: ./data
sources:
  front_door_camera:
    uri: no_secret_uri
    type: video
ai_models:
  image_detection:
    labels: ai_models/coco_labels.txt
pipelines:
  front_door_watch:
    - source: front_door_camera
"#;

pub const CONFIG_NO_PIPELINES: &str = r#"
logging:
  level: DEBUG
sources:
  front_door_camera:
    uri: no_secret_uri
pipelines:
"#;

/// A minimal valid config whose logging level is `level`.
pub fn config_with_level(level: &str) -> String {
    format!("logging:\n  level: {level}\npipelines:\n  watch:\n    - source: cam\n")
}

pub fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

pub fn fast_manager() -> ConfigManager {
    let mut settings = ManagerSettings::default();
    settings.watch.poll_interval_ms = POLL_MS;
    ConfigManager::new(settings)
}

/// A handler that forwards every document it receives into a channel.
pub fn channel_handler() -> (Arc<dyn ConfigHandler>, mpsc::UnboundedReceiver<Arc<ConfigDocument>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: Arc<dyn ConfigHandler> = Arc::new(
        move |config: &Arc<ConfigDocument>| -> Result<(), HandlerError> {
            tx.send(config.clone())?;
            Ok(())
        },
    );
    (handler, rx)
}

/// Wait up to a few seconds for the next dispatched document.
pub async fn next_config(rx: &mut mpsc::UnboundedReceiver<Arc<ConfigDocument>>) -> Arc<ConfigDocument> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Failed to detect change")
        .expect("handler channel closed")
}

/// Let the loop run for `polls` intervals.
pub async fn settle(polls: u32) {
    tokio::time::sleep(Duration::from_millis(POLL_MS * u64::from(polls))).await;
}

pub fn level(config: &ConfigDocument) -> Option<&str> {
    config.lookup("logging.level").and_then(|v| v.as_str())
}
