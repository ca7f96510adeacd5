//! Configuration management for RemindWallpaper
//!
//! `Configuration` is the user's persisted choice of folders, exclusion
//! pattern and interval. `AppConfig` holds engine tuning that is not
//! persisted: which files count as photos, interval floor, watcher debounce.

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::store::ConfigStore;

pub const PHOTOS_PATHS_KEY: &str = "PhotosPaths";
pub const EXCLUDE_REGEX_KEY: &str = "ExcludeRegex";
pub const INTERVAL_KEY: &str = "Interval";

pub const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// The user-facing settings owned by the changer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub paths: Vec<String>,
    pub exclude_regex: Option<String>,
    pub interval_ms: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            exclude_regex: None,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl Configuration {
    pub fn load(store: &dyn ConfigStore) -> Self {
        let paths = store
            .get(PHOTOS_PATHS_KEY)
            .map(|joined| normalize_paths(joined.split(';')))
            .unwrap_or_default();

        let exclude_regex = store
            .get(EXCLUDE_REGEX_KEY)
            .filter(|s| !s.trim().is_empty());

        let interval_ms = store
            .get(INTERVAL_KEY)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_INTERVAL_MS);

        Self {
            paths,
            exclude_regex,
            interval_ms,
        }
    }

    /// Write every key. The caller persists.
    pub fn save(&self, store: &mut dyn ConfigStore) {
        store.set(PHOTOS_PATHS_KEY, self.paths.join(";"));
        store.set(EXCLUDE_REGEX_KEY, self.exclude_regex.clone().unwrap_or_default());
        store.set(INTERVAL_KEY, self.interval_ms.to_string());
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Trim entries, drop empty ones and duplicates, keep first-seen order.
pub fn normalize_paths<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for path in paths {
        let path = path.as_ref().trim();
        if !path.is_empty() && !out.iter().any(|p| p == path) {
            out.push(path.to_string());
        }
    }
    out
}

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub rotation: RotationConfig,
    pub watcher: WatcherConfig,
}

/// Configuration for folder scans
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Extensions that count as photos, matched case-insensitively
    pub extensions: Vec<String>,
    /// Follow symbolic links while walking
    pub follow_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Lower bound applied to user-supplied intervals
    pub min_interval_ms: u64,
}

/// Configuration for folder watching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Quiet period before a burst of file events triggers a rescan
    pub debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            rotation: RotationConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".to_string()],
            follow_links: false,
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self { min_interval_ms: 1000 }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl WatcherConfig {
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl RotationConfig {
    pub fn clamp_interval_ms(&self, interval_ms: u64) -> u64 {
        interval_ms.max(self.min_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REMIND_WALLPAPER_EXTENSIONS") {
            let extensions = normalize_paths(val.split(','))
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect::<Vec<_>>();
            if !extensions.is_empty() {
                config.scanner.extensions = extensions;
            }
        }

        if let Ok(val) = std::env::var("REMIND_WALLPAPER_MIN_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.rotation.min_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("REMIND_WALLPAPER_WATCH_DEBOUNCE_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.watcher.debounce_ms = ms;
            }
        }

        config
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.scanner.extensions.is_empty() {
            return Err("at least one photo extension is required".to_string());
        }

        if self.scanner.extensions.iter().any(|e| e.is_empty() || e.contains('.')) {
            return Err("extensions must be non-empty and given without dots".to_string());
        }

        if self.watcher.debounce_ms == 0 {
            return Err("debounce_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}
