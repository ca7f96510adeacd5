//! Per-directory photo index refreshed by background scans.
//!
//! Every `refresh` bumps a generation counter. A scan captures the generation
//! it was launched under and commits its result only if that generation is
//! still current when the scan finishes; otherwise the result is dropped.
//! Scans do their I/O and filtering outside the lock.

use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use crate::core::events::{ChangerEvent, Notifier, PhotoFile, PhotoFolder};
use crate::filter::FilterPolicy;
use crate::lister::FileLister;

/// What the rotation loop should do to bring the index back in line with the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Everything indexed still qualifies.
    None,
    /// Some files aged out but others remain; prune in place.
    Prune,
    /// Nothing indexed qualifies any more; rescan the configured folders.
    Rescan,
}

impl Reconciliation {
    pub fn classify(policy: &FilterPolicy, files: &[PhotoFile]) -> Self {
        let any_failing = files.iter().any(|f| !policy.matches(&f.path));
        if !any_failing {
            return Reconciliation::None;
        }
        if files.iter().any(|f| policy.matches(&f.path)) {
            Reconciliation::Prune
        } else {
            Reconciliation::Rescan
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    folders: Vec<PhotoFolder>,
    generation: u64,
    paths: Vec<String>,
    in_flight: usize,
}

struct IndexShared {
    state: Mutex<IndexState>,
    scans_idle: Condvar,
    policy: RwLock<FilterPolicy>,
    lister: Arc<dyn FileLister>,
    extensions: Vec<String>,
    notifier: Arc<Notifier>,
    scans_launched: AtomicUsize,
}

/// Shared handle to the folder index. Clones refer to the same index.
#[derive(Clone)]
pub struct FolderIndex {
    shared: Arc<IndexShared>,
}

impl FolderIndex {
    pub fn new(
        lister: Arc<dyn FileLister>,
        extensions: Vec<String>,
        policy: FilterPolicy,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            shared: Arc::new(IndexShared {
                state: Mutex::new(IndexState::default()),
                scans_idle: Condvar::new(),
                policy: RwLock::new(policy),
                lister,
                extensions,
                notifier,
                scans_launched: AtomicUsize::new(0),
            }),
        }
    }

    pub fn policy(&self) -> FilterPolicy {
        self.shared
            .policy
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the filter used by future scans and reconciliations.
    /// Callers that need existing entries re-evaluated follow up with a forced refresh.
    pub fn set_policy(&self, policy: FilterPolicy) {
        *self
            .shared
            .policy
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = policy;
    }

    /// Prune folders no longer configured (all of them when `force_reload`),
    /// advance the generation, then launch one scan per path.
    ///
    /// Returns the generation the launched scans belong to.
    pub fn refresh(&self, paths: &[String], force_reload: bool) -> u64 {
        let generation = {
            let mut state = self.lock();
            state
                .folders
                .retain(|f| !force_reload && paths.contains(&f.path));
            state.generation += 1;
            state.paths = paths.to_vec();
            state.in_flight += paths.len();
            state.generation
        };

        tracing::debug!(
            "Refreshing {} folder(s) at generation {} (force: {})",
            paths.len(),
            generation,
            force_reload
        );

        for path in paths {
            self.launch_scan(path.clone(), generation);
        }

        generation
    }

    /// Refresh the most recently configured paths without forcing.
    pub fn rescan(&self) -> u64 {
        let paths = self.lock().paths.clone();
        self.refresh(&paths, false)
    }

    /// Point-in-time copy of every indexed file, in folder order.
    pub fn snapshot(&self) -> Vec<PhotoFile> {
        self.lock()
            .folders
            .iter()
            .flat_map(|f| f.files.iter().cloned())
            .collect()
    }

    pub fn folders(&self) -> Vec<PhotoFolder> {
        self.lock().folders.clone()
    }

    /// Drop files that no longer pass the filter, then any folder left empty.
    pub fn reconcile(&self) {
        let policy = self.policy();
        let mut state = self.lock();
        let before: usize = state.folders.iter().map(|f| f.files.len()).sum();

        for folder in state.folders.iter_mut() {
            folder.files.retain(|f| policy.matches(&f.path));
        }
        state.folders.retain(|f| !f.files.is_empty());

        let after: usize = state.folders.iter().map(|f| f.files.len()).sum();
        tracing::debug!("Reconciled index: {} -> {} photo(s)", before, after);
    }

    pub fn has_any_matching(&self) -> bool {
        let policy = self.policy();
        self.snapshot().iter().any(|f| policy.matches(&f.path))
    }

    pub fn has_any_non_matching(&self) -> bool {
        let policy = self.policy();
        self.snapshot().iter().any(|f| !policy.matches(&f.path))
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn configured_paths(&self) -> Vec<String> {
        self.lock().paths.clone()
    }

    pub fn scans_launched(&self) -> usize {
        self.shared.scans_launched.load(Ordering::SeqCst)
    }

    pub fn pending_scans(&self) -> usize {
        self.lock().in_flight
    }

    /// Block until no scan is in flight. Returns false on timeout.
    pub fn wait_for_scans(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.in_flight > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = match self.shared.scans_idle.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    fn launch_scan(&self, path: String, generation: u64) {
        self.shared.scans_launched.fetch_add(1, Ordering::SeqCst);
        let index = self.clone();

        let spawned = thread::Builder::new()
            .name(format!("scan-{}", generation))
            .spawn({
                let path = path.clone();
                move || index.run_scan(path, generation)
            });

        if let Err(err) = spawned {
            tracing::error!("Failed to spawn scan for {}: {}", path, err);
            self.finish_scan();
        }
    }

    fn run_scan(&self, path: String, generation: u64) {
        let listed = self
            .shared
            .lister
            .list_files(Path::new(&path), &self.shared.extensions, true);

        let files = match listed {
            Ok(files) => {
                // Filter as of completion, not launch
                let policy = self.policy();
                files
                    .into_iter()
                    .filter(|f| policy.matches(&f.path))
                    .collect::<Vec<_>>()
            }
            Err(err) => {
                tracing::warn!("Scan of {} failed: {}", path, err);
                self.shared.notifier.notify(ChangerEvent::ScanFailed {
                    path: path.clone(),
                    message: err.to_string(),
                });
                self.finish_scan();
                return;
            }
        };

        {
            let mut state = self.lock();
            if state.generation == generation {
                tracing::debug!("Committing {} photo(s) for {}", files.len(), path);
                match state.folders.iter_mut().find(|f| f.path == path) {
                    Some(folder) => folder.files = files,
                    None => state.folders.push(PhotoFolder { path, files }),
                }
            } else {
                tracing::debug!(
                    "Dropping stale scan of {} (generation {} < {})",
                    path,
                    generation,
                    state.generation
                );
            }
        }

        self.finish_scan();
    }

    fn finish_scan(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            self.shared.scans_idle.notify_all();
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
