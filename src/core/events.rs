use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::SystemTime;

/// A file found by a folder scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl PhotoFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            size: 0,
            modified: None,
        }
    }

    pub fn with_metadata(mut self, size: u64, modified: Option<SystemTime>) -> Self {
        self.size = size;
        self.modified = modified;
        self
    }
}

/// The qualifying photos of one configured directory, as of its last committed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFolder {
    pub path: String,
    pub files: Vec<PhotoFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangerEvent {
    /// Running flag, available count or last shown photo may have changed.
    /// Subscribers re-read the changer's properties.
    StateChanged,
    ScanFailed { path: String, message: String },
    ApplyFailed { path: PathBuf, message: String },
}

/// Fans events out to every live subscriber.
#[derive(Debug, Default)]
pub struct Notifier {
    subscribers: Mutex<Vec<Sender<ChangerEvent>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ChangerEvent> {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        rx
    }

    pub fn notify(&self, event: ChangerEvent) {
        // Receivers that were dropped are pruned here
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<ChangerEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
