//! Configuration lifecycle controller.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_yaml::Value;
use tokio::task::JoinHandle;

use crate::config::document::{AI_MODELS_SECTION, PIPELINES_SECTION, SOURCES_SECTION};
use crate::config::fingerprint::{self, Fingerprinter};
use crate::config::watcher::ConfigWatcher;
use crate::config::{ConfigDocument, ConfigLoader, ManagerSettings};
use crate::handlers::ConfigHandler;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::store::ConfigStore;

/// A running watch loop.
struct WatchTask {
    directory: PathBuf,
    generation: u64,
    // Dropping this closes the loop's shutdown channel.
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// Owns the current configuration, the handler registry and the watch loop.
///
/// Typically created once by the binary's composition root and shared by
/// reference. Independent instances do not interact, which keeps tests
/// isolated.
///
/// Dropping the manager signals a running loop to exit at its next
/// iteration; call [`stop`](Self::stop) to wait for it.
pub struct ConfigManager {
    store: Arc<ConfigStore>,
    poll_interval: Duration,
    task: Mutex<Option<WatchTask>>,
}

impl ConfigManager {
    pub fn new(settings: ManagerSettings) -> Self {
        let fingerprinter = fingerprint::for_kind(settings.watch.fingerprint);
        Self::build(settings, fingerprinter)
    }

    /// Use a custom change-detection strategy instead of the one named in
    /// `settings.watch.fingerprint`.
    pub fn with_fingerprinter(
        settings: ManagerSettings,
        fingerprinter: impl Fingerprinter + 'static,
    ) -> Self {
        Self::build(settings, Box::new(fingerprinter))
    }

    fn build(settings: ManagerSettings, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        let poll_interval = settings.watch.poll_interval();
        let loader = ConfigLoader::new(settings.loader);
        Self {
            store: Arc::new(ConfigStore::new(loader, fingerprinter)),
            poll_interval,
            task: Mutex::new(None),
        }
    }

    /// Load `directory` once and publish the result if it is valid.
    ///
    /// Works with or without a running watch loop. Handlers are not called
    /// here. A running loop on the same directory still detects the change
    /// and dispatches it.
    pub fn load(&self, directory: impl AsRef<Path>) -> Option<Arc<ConfigDocument>> {
        self.store.load(directory.as_ref())
    }

    /// Spawn the watch loop for `directory` on the current tokio runtime.
    ///
    /// Returns `false` without doing anything if a loop is already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(&self, directory: impl AsRef<Path>) -> bool {
        let directory = directory.as_ref();
        let mut task = self.lock_task();

        if let Some(running) = task.as_ref().filter(|t| !t.handle.is_finished()) {
            tracing::debug!(
                directory = %running.directory.display(),
                "Config watcher already running"
            );
            return false;
        }

        let generation = self.store.begin_watch(directory);

        let shutdown = Shutdown::new();
        let watcher = ConfigWatcher::new(
            self.store.clone(),
            directory.to_path_buf(),
            self.poll_interval,
        );
        let handle = tokio::spawn(watcher.run(shutdown.subscribe()));

        *task = Some(WatchTask {
            directory: directory.to_path_buf(),
            generation,
            shutdown,
            handle,
        });
        true
    }

    /// [`load`](Self::load) followed by [`start`](Self::start).
    pub fn load_and_watch(&self, directory: impl AsRef<Path>) -> Option<Arc<ConfigDocument>> {
        let directory = directory.as_ref();
        let config = self.load(directory);
        self.start(directory);
        config
    }

    /// Stop the watch loop and wait for it to exit.
    ///
    /// Once this returns no handler will be called until the next
    /// [`start`](Self::start). Handlers stay registered. Calling it while
    /// stopped does nothing.
    pub async fn stop(&self) {
        let task = self.lock_task().take();
        let Some(task) = task else {
            return;
        };

        task.shutdown.trigger();
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Config watcher panicked");
            }
        }
        self.store.end_watch(task.generation);

        tracing::info!(directory = %task.directory.display(), "Config watcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Directory polled by the running loop, if any.
    pub fn watched_directory(&self) -> Option<PathBuf> {
        self.lock_task().as_ref().map(|t| t.directory.clone())
    }

    /// The last successfully published configuration.
    pub fn current(&self) -> Option<Arc<ConfigDocument>> {
        self.store.current()
    }

    /// Register `handler` for future reloads. Registering the same `Arc`
    /// twice is a no-op; returns whether the registry changed.
    pub fn register_handler(&self, handler: Arc<dyn ConfigHandler>) -> bool {
        self.store.handlers().register(handler)
    }

    pub fn unregister_handler(&self, handler: &Arc<dyn ConfigHandler>) -> bool {
        self.store.handlers().unregister(handler)
    }

    pub fn handler_count(&self) -> usize {
        self.store.handlers().count()
    }

    pub fn clear_handlers(&self) {
        self.store.handlers().clear();
    }

    pub fn get_sources(&self) -> Option<Value> {
        self.current()?.sources().cloned()
    }

    pub fn get_source(&self, id: &str) -> Option<Value> {
        self.current()?.entry(SOURCES_SECTION, id).cloned()
    }

    pub fn get_ai_models(&self) -> Option<Value> {
        self.current()?.ai_models().cloned()
    }

    pub fn get_ai_model(&self, id: &str) -> Option<Value> {
        self.current()?.entry(AI_MODELS_SECTION, id).cloned()
    }

    pub fn get_pipelines(&self) -> Option<Value> {
        self.current()?.pipelines().cloned()
    }

    pub fn get_pipeline(&self, id: &str) -> Option<Value> {
        self.current()?.entry(PIPELINES_SECTION, id).cloned()
    }

    pub fn get_data_dir(&self) -> Option<PathBuf> {
        self.current()?.data_dir()
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<WatchTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(ManagerSettings::default())
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("poll_interval", &self.poll_interval)
            .field("watching", &self.watched_directory())
            .field("handlers", &self.handler_count())
            .finish()
    }
}
