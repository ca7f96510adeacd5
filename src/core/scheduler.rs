//! Periodic wallpaper rotation.
//!
//! Each `start` opens a new epoch and spawns a loop bound to it. A loop keeps
//! running only while its epoch is the active one, so a superseded or stopped
//! loop exits at its next check instead of producing a second stream of
//! apply calls. The wait between ticks is a condvar wait, so `stop` and
//! `start` wake a sleeping loop immediately.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::applier::WallpaperApplier;
use crate::core::events::{ChangerEvent, Notifier};
use crate::core::index::{FolderIndex, Reconciliation};

/// Identifies one run of the rotation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationState {
    pub running: bool,
    pub active_epoch: Epoch,
    pub last_shown: Option<PathBuf>,
    pub available: usize,
}

struct SchedulerShared {
    index: FolderIndex,
    applier: Arc<dyn WallpaperApplier>,
    notifier: Arc<Notifier>,
    state: Mutex<RotationState>,
    // Held for the duration of each apply call; never taken while `state` is held
    apply_gate: Mutex<()>,
    wake: Condvar,
    interval_ms: AtomicU64,
    rng: Mutex<StdRng>,
}

#[derive(Clone)]
pub struct RotationScheduler {
    shared: Arc<SchedulerShared>,
}

impl RotationScheduler {
    pub fn new(
        index: FolderIndex,
        applier: Arc<dyn WallpaperApplier>,
        notifier: Arc<Notifier>,
        interval: Duration,
    ) -> Self {
        Self::with_rng(index, applier, notifier, interval, StdRng::from_entropy())
    }

    pub fn with_rng(
        index: FolderIndex,
        applier: Arc<dyn WallpaperApplier>,
        notifier: Arc<Notifier>,
        interval: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                index,
                applier,
                notifier,
                state: Mutex::new(RotationState::default()),
                apply_gate: Mutex::new(()),
                wake: Condvar::new(),
                interval_ms: AtomicU64::new(duration_millis(interval)),
                rng: Mutex::new(rng),
            }),
        }
    }

    /// Start rotating, replacing any loop that is already running.
    /// Returns the epoch of the new loop.
    pub fn start(&self) -> Epoch {
        let epoch = {
            let mut state = self.lock();
            state.active_epoch = Epoch(state.active_epoch.0 + 1);
            state.running = true;
            state.active_epoch
        };
        // Wake a superseded loop so it exits now rather than after its sleep
        self.shared.wake.notify_all();

        let scheduler = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("rotation-{}", epoch.0))
            .spawn(move || scheduler.run(epoch));

        match spawned {
            Ok(_) => tracing::info!("Rotation started (epoch {})", epoch.0),
            Err(err) => {
                tracing::error!("Failed to spawn rotation loop: {}", err);
                let mut state = self.lock();
                if state.active_epoch == epoch {
                    state.running = false;
                }
            }
        }

        self.shared.notifier.notify(ChangerEvent::StateChanged);
        epoch
    }

    /// Stop rotating. Once this returns no apply call is in progress and
    /// none will be made. An apply already running is waited for.
    pub fn stop(&self) {
        {
            let mut state = self.lock();
            if !state.running {
                return;
            }
            state.active_epoch = Epoch(state.active_epoch.0 + 1);
            state.running = false;
        }
        self.shared.wake.notify_all();
        // Observers stay responsive meanwhile: the state lock is not held here
        drop(self.lock_apply());
        tracing::info!("Rotation stopped");
        self.shared.notifier.notify(ChangerEvent::StateChanged);
    }

    pub fn state(&self) -> RotationState {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn available(&self) -> usize {
        self.lock().available
    }

    pub fn last_shown(&self) -> Option<PathBuf> {
        self.lock().last_shown.clone()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.shared.interval_ms.load(Ordering::SeqCst))
    }

    /// Takes effect from the next wait.
    pub fn set_interval(&self, interval: Duration) {
        self.shared
            .interval_ms
            .store(duration_millis(interval), Ordering::SeqCst);
    }

    fn run(&self, epoch: Epoch) {
        while self.tick(epoch) {
            if !self.wait_next(epoch) {
                break;
            }
        }
        tracing::debug!("Rotation loop for epoch {} exited", epoch.0);
    }

    /// One selection plus reconciliation. Returns false if the epoch was superseded.
    fn tick(&self, epoch: Epoch) -> bool {
        let files = self.shared.index.snapshot();

        let picked = {
            let mut state = self.lock();
            if state.active_epoch != epoch {
                return false;
            }
            state.available = files.len();

            if files.is_empty() {
                None
            } else {
                let pick = self.random_index(files.len());
                Some(files[pick].path.clone())
            }
        };

        let shown = match picked {
            Some(path) => {
                let _gate = self.lock_apply();
                if !self.is_active(epoch) {
                    return false;
                }
                if let Err(err) = self.shared.applier.apply(&path) {
                    tracing::warn!("{}", err);
                    self.shared.notifier.notify(ChangerEvent::ApplyFailed {
                        path: path.clone(),
                        message: err.to_string(),
                    });
                }
                self.lock().last_shown = Some(path.clone());
                Some(path)
            }
            None => None,
        };

        if let Some(path) = shown {
            tracing::debug!("Showing {}", path.display());
            self.shared.notifier.notify(ChangerEvent::StateChanged);
        }

        self.reconcile(&files);
        true
    }

    fn reconcile(&self, files: &[crate::core::PhotoFile]) {
        let index = &self.shared.index;
        match Reconciliation::classify(&index.policy(), files) {
            Reconciliation::None => {}
            Reconciliation::Prune => index.reconcile(),
            Reconciliation::Rescan => {
                if index.pending_scans() == 0 {
                    tracing::info!("No indexed photo qualifies any more, rescanning");
                    index.rescan();
                }
            }
        }
    }

    /// Sleep for the interval. Returns false if the epoch was superseded meanwhile.
    fn wait_next(&self, epoch: Epoch) -> bool {
        let deadline = Instant::now() + self.interval();
        let mut state = self.lock();
        loop {
            if state.active_epoch != epoch {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            state = match self.shared.wake.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn random_index(&self, len: usize) -> usize {
        self.shared
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen_range(0..len)
    }

    fn is_active(&self, epoch: Epoch) -> bool {
        self.lock().active_epoch == epoch
    }

    fn lock_apply(&self) -> MutexGuard<'_, ()> {
        self.shared
            .apply_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, RotationState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn duration_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}
