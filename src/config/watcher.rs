//! Polling watch loop for hot reload.
//!
//! # States
//! ```text
//! Idle → Polling   (ConfigManager::start spawns the loop)
//! Polling → Idle   (shutdown signal, or the manager is dropped)
//! ```
//!
//! Each tick fingerprints the watched files. On a change the directory is
//! reloaded; a successful reload is published and dispatched to handlers.
//! The tick runs on the blocking pool so file I/O and slow handlers never
//! stall runtime workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::store::ConfigStore;

pub(crate) struct ConfigWatcher {
    store: Arc<ConfigStore>,
    directory: PathBuf,
    interval: Duration,
}

impl ConfigWatcher {
    pub(crate) fn new(store: Arc<ConfigStore>, directory: PathBuf, interval: Duration) -> Self {
        Self {
            store,
            directory,
            interval,
        }
    }

    /// Poll until `shutdown` fires or its sender is dropped.
    pub(crate) async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            directory = %self.directory.display(),
            interval = ?self.interval,
            "Config watcher started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Config watcher received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let store = self.store.clone();
        let directory = self.directory.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || reload(&store, &directory)).await {
            tracing::error!(error = %e, "Config watcher tick failed");
        }
    }
}

fn reload(store: &ConfigStore, directory: &Path) {
    let Some(config) = store.poll(directory) else {
        return;
    };

    let report = store.handlers().dispatch(&config);
    tracing::info!(
        directory = %directory.display(),
        delivered = report.delivered,
        failed = report.failed,
        "Configuration reloaded"
    );
}
