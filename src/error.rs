//! Error type shared by the indexing, rotation and configuration layers.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChangerError>;

#[derive(Debug, Error)]
pub enum ChangerError {
    #[error("invalid exclusion pattern `{pattern}`: {source}")]
    InvalidFilterPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no photo folders are configured")]
    NotConfigured,

    #[error("failed to list photos under {}: {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to access settings file {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file is not valid TOML: {0}")]
    StoreFormat(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    StoreSerialize(#[from] toml::ser::Error),

    #[error("failed to apply wallpaper {}: {message}", path.display())]
    Apply { path: PathBuf, message: String },

    #[error("folder watcher error: {0}")]
    Watch(#[from] notify::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_message_names_pattern() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = ChangerError::InvalidFilterPattern {
            pattern: "(".to_string(),
            source,
        };

        assert!(err.to_string().starts_with("invalid exclusion pattern `(`"));
    }

    #[test]
    fn test_listing_error_includes_path() {
        let err = ChangerError::Listing {
            path: PathBuf::from("/missing/photos"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };

        assert!(err.to_string().contains("/missing/photos"));
    }
}
