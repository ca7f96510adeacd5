use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use remind_wallpaper::config::{AppConfig, INTERVAL_KEY, PHOTOS_PATHS_KEY};
use remind_wallpaper::{
    current_date_token, ChangerError, MemoryConfigStore, WallpaperApplier, WallpaperChanger,
    WalkLister,
};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Recorder {
    applied: Mutex<Vec<(PathBuf, Instant)>>,
}

impl Recorder {
    fn count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.applied.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    fn after(&self, instant: Instant) -> usize {
        self.applied.lock().unwrap().iter().filter(|(_, at)| *at > instant).count()
    }

    fn wait_for(&self, count: usize) -> bool {
        let deadline = Instant::now() + WAIT;
        while self.count() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        self.count() >= count
    }
}

impl WallpaperApplier for Recorder {
    fn apply(&self, path: &Path) -> remind_wallpaper::Result<()> {
        self.applied.lock().unwrap().push((path.to_path_buf(), Instant::now()));
        Ok(())
    }
}

/// Three photos from this month last year plus one from an unrelated month.
fn photo_library() -> (TempDir, Vec<PathBuf>) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let month = temp.path().join(current_date_token());
    fs::create_dir_all(&month).unwrap();
    fs::create_dir_all(temp.path().join("1999_01")).unwrap();

    let matching: Vec<PathBuf> = ["a.jpg", "b.jpg", "c.jpg"]
        .iter()
        .map(|name| month.join(name))
        .collect();
    for path in &matching {
        fs::write(path, b"jpeg").unwrap();
    }
    fs::write(temp.path().join("1999_01/old.jpg"), b"jpeg").unwrap();
    fs::write(month.join("notes.txt"), b"not a photo").unwrap();

    (temp, matching)
}

fn changer_for(dir: &Path, interval_ms: u64, applier: Arc<Recorder>) -> WallpaperChanger {
    let store = MemoryConfigStore::new()
        .with_value(PHOTOS_PATHS_KEY, &dir.to_string_lossy())
        .with_value(INTERVAL_KEY, &interval_ms.to_string());
    WallpaperChanger::new(
        Box::new(store),
        Arc::new(WalkLister::default()),
        applier,
        &AppConfig::default(),
    )
    .expect("Failed to create changer")
}

#[test]
fn test_rotation_shows_only_matching_photos() {
    let (temp, matching) = photo_library();
    let applier = Arc::new(Recorder::default());
    let changer = changer_for(temp.path(), 5, applier.clone());
    assert!(changer.wait_for_scans(WAIT));
    assert!(changer.can_start());

    changer.start().unwrap();
    assert!(applier.wait_for(10), "Rotation should keep applying photos");

    assert_eq!(changer.available_count(), 3);
    for shown in applier.paths() {
        assert!(matching.contains(&shown), "Unexpected photo shown: {}", shown.display());
    }
    let last = changer.last_shown_path().expect("A photo should have been shown");
    assert!(matching.contains(&last));

    changer.stop();
    let stopped_at = Instant::now();
    thread::sleep(Duration::from_millis(100));

    assert!(!changer.is_running());
    assert_eq!(applier.after(stopped_at), 0);
}

#[test]
fn test_missing_folder_does_not_block_others() {
    let (temp, _) = photo_library();
    let applier = Arc::new(Recorder::default());
    let changer = changer_for(temp.path(), 60_000, applier);
    let missing = temp.path().join("does-not-exist");

    changer
        .set_configured_paths([temp.path().to_string_lossy().to_string(), missing.to_string_lossy().to_string()])
        .unwrap();
    assert!(changer.wait_for_scans(WAIT));

    assert_eq!(changer.index().snapshot().len(), 3);
    assert_eq!(changer.index().folders().len(), 1);
}

#[test]
fn test_exclusion_narrows_working_set() {
    let (temp, _) = photo_library();
    let applier = Arc::new(Recorder::default());
    let changer = changer_for(temp.path(), 60_000, applier);
    assert!(changer.wait_for_scans(WAIT));

    changer.set_exclusion_pattern(Some("B\\.JPG$")).unwrap();
    assert!(changer.wait_for_scans(WAIT));

    let files = changer.index().snapshot();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| !f.path.ends_with("b.jpg")));
}

#[test]
fn test_unconfigured_changer_refuses_to_start() {
    let temp = TempDir::new().unwrap();
    let changer = WallpaperChanger::new(
        Box::new(MemoryConfigStore::new()),
        Arc::new(WalkLister::default()),
        Arc::new(Recorder::default()),
        &AppConfig::default(),
    )
    .unwrap();
    fs::write(temp.path().join("ignored.jpg"), b"jpeg").unwrap();

    assert!(!changer.can_start());
    assert!(matches!(changer.start(), Err(ChangerError::NotConfigured)));
}
