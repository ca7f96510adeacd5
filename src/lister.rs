use std::path::Path;
use ignore::WalkBuilder;
use crate::core::PhotoFile;
use crate::error::{ChangerError, Result};

/// Enumerates candidate photos under a directory.
pub trait FileLister: Send + Sync {
    fn list_files(&self, dir: &Path, extensions: &[String], recursive: bool) -> Result<Vec<PhotoFile>>;
}

/// Lists files with `ignore`'s walker. Ignore files and hidden-file rules
/// are switched off so every photo on disk is seen.
#[derive(Debug, Clone, Default)]
pub struct WalkLister {
    follow_links: bool,
}

impl WalkLister {
    pub fn new(follow_links: bool) -> Self {
        Self { follow_links }
    }
}

impl FileLister for WalkLister {
    fn list_files(&self, dir: &Path, extensions: &[String], recursive: bool) -> Result<Vec<PhotoFile>> {
        let root = std::fs::metadata(dir).map_err(|source| ChangerError::Listing {
            path: dir.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(ChangerError::Listing {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let mut builder = WalkBuilder::new(dir);
        builder
            .standard_filters(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b));
        if !recursive {
            builder.max_depth(Some(1));
        }

        let mut files = Vec::new();
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let path = entry.path();
                    if !entry.file_type().map_or(false, |t| t.is_file()) || !has_extension(path, extensions) {
                        continue;
                    }
                    let file = match entry.metadata() {
                        Ok(meta) => PhotoFile::new(path.to_path_buf())
                            .with_metadata(meta.len(), meta.modified().ok()),
                        Err(_) => PhotoFile::new(path.to_path_buf()),
                    };
                    files.push(file);
                }
                Err(err) => {
                    tracing::warn!("Error walking {}: {}", dir.display(), err);
                }
            }
        }

        Ok(files)
    }
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
