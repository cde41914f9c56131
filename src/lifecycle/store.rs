//! State shared between a [`ConfigManager`](crate::lifecycle::ConfigManager)
//! and its watch loop.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;

use crate::config::fingerprint::{Fingerprint, Fingerprinter};
use crate::config::{ConfigDocument, ConfigLoader};
use crate::handlers::HandlerRegistry;
use crate::observability::metrics;

/// Last fingerprint seen for a directory.
#[derive(Debug)]
struct Baseline {
    directory: PathBuf,
    fingerprint: Fingerprint,
}

#[derive(Debug, Default)]
struct WatchState {
    /// Directory the watch loop polls, if one is running.
    watching: Option<PathBuf>,
    /// Bumped by every `begin_watch`; identifies the loop that owns `watching`.
    generation: u64,
    baseline: Option<Baseline>,
}

pub(crate) struct ConfigStore {
    loader: ConfigLoader,
    fingerprinter: Box<dyn Fingerprinter>,
    current: ArcSwapOption<ConfigDocument>,
    handlers: HandlerRegistry,
    // Also serializes every load-and-publish, foreground or polled.
    watch: Mutex<WatchState>,
}

impl ConfigStore {
    pub(crate) fn new(loader: ConfigLoader, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        Self {
            loader,
            fingerprinter,
            current: ArcSwapOption::empty(),
            handlers: HandlerRegistry::new(),
            watch: Mutex::new(WatchState::default()),
        }
    }

    pub(crate) fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub(crate) fn current(&self) -> Option<Arc<ConfigDocument>> {
        self.current.load_full()
    }

    /// One-shot load that publishes on success.
    ///
    /// With no loop running, records the directory's fingerprint as the
    /// watch baseline so a watch started afterwards does not report this
    /// content as a change. While a loop runs the baseline belongs to it:
    /// the loop still sees the change and dispatches it.
    pub(crate) fn load(&self, directory: &Path) -> Option<Arc<ConfigDocument>> {
        let mut state = self.lock();

        // Fingerprint before reading: a write racing the read shows up as a
        // change on the next poll instead of being missed.
        let fingerprint = self.fingerprint(directory);
        let loaded = self.loader.load(directory).map(Arc::new);

        if state.watching.is_none() {
            state.baseline = Some(Baseline {
                directory: directory.to_path_buf(),
                fingerprint,
            });
        }

        match &loaded {
            Some(config) => {
                self.current.store(Some(config.clone()));
                metrics::record_reload("loaded");
            }
            None => metrics::record_reload("rejected"),
        }
        loaded
    }

    /// Reload `directory` if its fingerprint moved since the last look.
    ///
    /// Returns the newly published document, or `None` when nothing changed
    /// or the new content was rejected. A rejected fingerprint is still
    /// remembered so a bad file is not re-read on every poll.
    pub(crate) fn poll(&self, directory: &Path) -> Option<Arc<ConfigDocument>> {
        let mut state = self.lock();
        let fingerprint = self.fingerprint(directory);

        let unchanged = state
            .baseline
            .as_ref()
            .is_some_and(|b| b.directory == directory && b.fingerprint == fingerprint);
        if unchanged {
            return None;
        }

        state.baseline = Some(Baseline {
            directory: directory.to_path_buf(),
            fingerprint,
        });

        tracing::info!(directory = %directory.display(), "Configuration change detected, reloading");
        match self.loader.load(directory) {
            Some(config) => {
                let config = Arc::new(config);
                self.current.store(Some(config.clone()));
                metrics::record_reload("reloaded");
                Some(config)
            }
            None => {
                tracing::warn!(
                    directory = %directory.display(),
                    "Reload failed. Keeping current configuration."
                );
                metrics::record_reload("rejected");
                None
            }
        }
    }

    /// Hand the watch state to a new loop. The returned generation must be
    /// passed back to [`end_watch`](Self::end_watch).
    pub(crate) fn begin_watch(&self, directory: &Path) -> u64 {
        let mut state = self.lock();
        if state
            .baseline
            .as_ref()
            .is_some_and(|b| b.directory != directory)
        {
            state.baseline = None;
        }
        state.watching = Some(directory.to_path_buf());
        state.generation += 1;
        state.generation
    }

    /// Clear the watch state, unless a newer loop has taken it over.
    pub(crate) fn end_watch(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.watching = None;
        state.baseline = None;
    }

    fn fingerprint(&self, directory: &Path) -> Fingerprint {
        self.fingerprinter
            .fingerprint(&self.loader.watched_paths(directory))
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.watch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
