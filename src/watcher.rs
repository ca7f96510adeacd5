use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use crate::core::FolderIndex;
use crate::error::Result;
use crate::lister::has_extension;

/// Rescans the index when photos appear, disappear or get renamed in a watched folder.
///
/// Bursts of events are coalesced: the rescan runs once no relevant event has
/// arrived for the debounce period. Dropping the watcher ends the background thread.
pub struct FolderWatcher {
    _watcher: RecommendedWatcher,
}

impl FolderWatcher {
    pub fn new(
        index: FolderIndex,
        paths: &[String],
        extensions: Vec<String>,
        debounce: Duration,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(tx)?;

        for path in paths {
            if let Err(err) = watcher.watch(Path::new(path), RecursiveMode::Recursive) {
                tracing::warn!("Cannot watch {}: {}", path, err);
            }
        }

        thread::Builder::new()
            .name("folder-watcher".to_string())
            .spawn(move || {
                let mut pending = false;
                loop {
                    match rx.recv_timeout(debounce) {
                        Ok(Ok(event)) => {
                            if is_relevant(&event, &extensions) {
                                pending = true;
                            }
                        }
                        Ok(Err(err)) => {
                            tracing::error!("Folder watcher error: {}", err);
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if pending {
                                pending = false;
                                tracing::debug!("Photo folders changed, rescanning");
                                index.rescan();
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(notify::Error::io)?;

        Ok(Self { _watcher: watcher })
    }
}

fn is_relevant(event: &Event, extensions: &[String]) -> bool {
    let kind_matters = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(notify::event::ModifyKind::Name(_))
    );
    // Renamed or removed directories carry no extension but may hold photos
    kind_matters
        && event
            .paths
            .iter()
            .any(|p| has_extension(p, extensions) || p.extension().is_none())
}
