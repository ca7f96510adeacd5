//! Test doubles for the lister and applier seams.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};
use crate::applier::WallpaperApplier;
use crate::core::PhotoFile;
use crate::error::{ChangerError, Result};
use crate::lister::FileLister;

#[derive(Default)]
pub struct StaticLister {
    files: HashMap<String, Vec<PhotoFile>>,
    failing: Vec<String>,
}

impl StaticLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(mut self, dir: &str, paths: &[&str]) -> Self {
        self.files.insert(
            dir.to_string(),
            paths.iter().map(|p| PhotoFile::new(PathBuf::from(p))).collect(),
        );
        self
    }

    pub fn with_failure(mut self, dir: &str) -> Self {
        self.failing.push(dir.to_string());
        self
    }

    fn lookup(&self, dir: &Path) -> Result<Vec<PhotoFile>> {
        let key = dir.to_string_lossy().to_string();
        if self.failing.contains(&key) {
            return Err(ChangerError::Listing {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            });
        }
        Ok(self.files.get(&key).cloned().unwrap_or_default())
    }
}

impl FileLister for StaticLister {
    fn list_files(&self, dir: &Path, _extensions: &[String], _recursive: bool) -> Result<Vec<PhotoFile>> {
        self.lookup(dir)
    }
}

#[derive(Default)]
struct Gate {
    open: bool,
    callers: usize,
}

/// A lister that blocks every call until the gate is opened.
#[derive(Default)]
pub struct GatedLister {
    inner: StaticLister,
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl GatedLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(mut self, dir: &str, paths: &[&str]) -> Self {
        self.inner = self.inner.with_files(dir, paths);
        self
    }

    pub fn open(&self) {
        self.gate.lock().unwrap().open = true;
        self.changed.notify_all();
    }

    pub fn close(&self) {
        self.gate.lock().unwrap().open = false;
    }

    pub fn wait_for_callers(&self, count: usize, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut gate = self.gate.lock().unwrap();
        while gate.callers < count && Instant::now() < deadline {
            gate = self.changed.wait_timeout(gate, Duration::from_millis(10)).unwrap().0;
        }
        assert!(gate.callers >= count, "lister was not called in time");
    }
}

impl FileLister for GatedLister {
    fn list_files(&self, dir: &Path, _extensions: &[String], _recursive: bool) -> Result<Vec<PhotoFile>> {
        let mut gate = self.gate.lock().unwrap();
        gate.callers += 1;
        self.changed.notify_all();
        while !gate.open {
            gate = self.changed.wait(gate).unwrap();
        }
        drop(gate);
        self.inner.lookup(dir)
    }
}

/// Records every apply call and tracks how many overlap.
#[derive(Default)]
pub struct RecordingApplier {
    applied: Mutex<Vec<(PathBuf, Instant)>>,
    started: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    fail: AtomicBool,
    delay: Duration,
}

impl RecordingApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let applier = Self::default();
        applier.fail.store(true, Ordering::SeqCst);
        applier
    }

    pub fn applied(&self) -> Vec<PathBuf> {
        self.applied.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn applied_after(&self, instant: Instant) -> usize {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, at)| *at > instant)
            .count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.count() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.count() >= count
    }

    /// Like `wait_for_count`, but counts calls that have entered `apply`.
    pub fn wait_for_started(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.started.load(Ordering::SeqCst) < count && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        self.started.load(Ordering::SeqCst) >= count
    }
}

impl WallpaperApplier for RecordingApplier {
    fn apply(&self, path: &Path) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.applied.lock().unwrap().push((path.to_path_buf(), Instant::now()));
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ChangerError::Apply {
                path: path.to_path_buf(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}
