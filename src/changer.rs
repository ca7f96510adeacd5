//! The wallpaper changer: configuration, rotation control and status in one place.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use serde::Serialize;
use crate::applier::WallpaperApplier;
use crate::config::{normalize_paths, AppConfig, Configuration};
use crate::core::{ChangerEvent, Epoch, FolderIndex, Notifier, RotationScheduler};
use crate::error::{ChangerError, Result};
use crate::filter::{compile_exclusion, FilterPolicy};
use crate::lister::FileLister;
use crate::store::ConfigStore;

/// Everything an observer needs to redraw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangerStatus {
    pub running: bool,
    pub configured: bool,
    pub can_start: bool,
    pub available: usize,
    pub last_shown: Option<PathBuf>,
}

pub struct WallpaperChanger {
    config: RwLock<Configuration>,
    store: Mutex<Box<dyn ConfigStore>>,
    index: FolderIndex,
    scheduler: RotationScheduler,
    notifier: Arc<Notifier>,
}

impl WallpaperChanger {
    /// Load settings from `store` and kick off the initial scan.
    ///
    /// Fails if the stored exclusion pattern does not compile.
    pub fn new(
        store: Box<dyn ConfigStore>,
        lister: Arc<dyn FileLister>,
        applier: Arc<dyn WallpaperApplier>,
        app_config: &AppConfig,
    ) -> Result<Self> {
        let config = Configuration::load(&*store);
        let policy = FilterPolicy::new(compile_exclusion(config.exclude_regex.as_deref())?);

        let notifier = Arc::new(Notifier::new());
        let index = FolderIndex::new(
            lister,
            app_config.scanner.extensions.clone(),
            policy,
            notifier.clone(),
        );
        let scheduler = RotationScheduler::new(
            index.clone(),
            applier,
            notifier.clone(),
            config.interval(),
        );

        tracing::info!(
            "Loaded {} photo folder(s), interval {} ms",
            config.paths.len(),
            config.interval_ms
        );
        index.refresh(&config.paths, false);

        Ok(Self {
            config: RwLock::new(config),
            store: Mutex::new(store),
            index,
            scheduler,
            notifier,
        })
    }

    pub fn configured_paths(&self) -> Vec<String> {
        self.read_config().paths.clone()
    }

    /// Replace the folder list. Blank and duplicate entries are dropped.
    pub fn set_configured_paths<I, S>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = normalize_paths(paths);
        // Held through save and refresh so concurrent setters reach the
        // store and the index in the same order
        let mut config = self.write_config();
        config.paths = paths;
        tracing::info!("Photo folders set to {:?}", config.paths);

        let saved = self.save(&config);
        self.index.refresh(&config.paths, false);
        saved
    }

    pub fn exclusion_pattern(&self) -> Option<String> {
        self.read_config().exclude_regex.clone()
    }

    /// Change the exclusion pattern. Setting the current value (empty and
    /// absent count as equal) does nothing.
    pub fn set_exclusion_pattern(&self, pattern: Option<&str>) -> Result<()> {
        let pattern = pattern.map(str::trim).filter(|p| !p.is_empty());
        let mut config = self.write_config();
        if config.exclude_regex.as_deref() == pattern {
            return Ok(());
        }

        let regex = compile_exclusion(pattern)?;
        config.exclude_regex = pattern.map(str::to_string);
        tracing::info!("Exclusion pattern set to {:?}", pattern);

        self.index.set_policy(FilterPolicy::new(regex));
        let saved = self.save(&config);
        self.index.refresh(&config.paths, true);
        saved
    }

    pub fn interval_millis(&self) -> u64 {
        self.read_config().interval_ms
    }

    /// Takes effect from the next wait of the rotation loop.
    pub fn set_interval_millis(&self, interval_ms: u64) -> Result<()> {
        let mut config = self.write_config();
        config.interval_ms = interval_ms;
        self.scheduler.set_interval(Duration::from_millis(interval_ms));
        self.save(&config)
    }

    pub fn is_configured(&self) -> bool {
        !self.read_config().paths.is_empty()
    }

    pub fn can_start(&self) -> bool {
        self.is_configured() && !self.index.snapshot().is_empty()
    }

    /// Start rotating, or restart with an immediate pick if already running.
    ///
    /// Rejected with `NotConfigured` when no folder is configured. With
    /// folders configured but nothing indexed yet, the loop starts and idles
    /// until scans deliver photos.
    pub fn start(&self) -> Result<Epoch> {
        if !self.is_configured() {
            return Err(ChangerError::NotConfigured);
        }
        Ok(self.scheduler.start())
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn available_count(&self) -> usize {
        self.scheduler.available()
    }

    pub fn last_shown_path(&self) -> Option<PathBuf> {
        self.scheduler.last_shown()
    }

    pub fn status(&self) -> ChangerStatus {
        let state = self.scheduler.state();
        ChangerStatus {
            running: state.running,
            configured: self.is_configured(),
            can_start: self.can_start(),
            available: state.available,
            last_shown: state.last_shown,
        }
    }

    pub fn subscribe(&self) -> Receiver<ChangerEvent> {
        self.notifier.subscribe()
    }

    pub fn index(&self) -> &FolderIndex {
        &self.index
    }

    /// Block until the initial or most recent scans have finished.
    pub fn wait_for_scans(&self, timeout: Duration) -> bool {
        self.index.wait_for_scans(timeout)
    }

    fn save(&self, config: &Configuration) -> Result<()> {
        let mut store = self.lock_store();
        config.save(&mut **store);
        store.persist().map_err(|err| {
            tracing::warn!("Failed to save settings: {}", err);
            err
        })
    }

    fn read_config(&self) -> std::sync::RwLockReadGuard<'_, Configuration> {
        self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_config(&self) -> std::sync::RwLockWriteGuard<'_, Configuration> {
        self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_store(&self) -> MutexGuard<'_, Box<dyn ConfigStore>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for WallpaperChanger {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}
