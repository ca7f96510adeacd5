//! Which indexed files are eligible to be shown today.

use std::path::Path;
use chrono::{Datelike, Local, NaiveDate};
use regex::{Regex, RegexBuilder};
use crate::error::{ChangerError, Result};

/// Decides whether a photo belongs to the current working set.
///
/// A photo qualifies when its full path contains `{year - 1}_{month:02}` for
/// the current local date and, if an exclusion pattern is set, the lower-cased
/// path does not match it. The date token is recomputed on every call, so a
/// scan that runs across midnight at the end of a month may admit files under
/// both the old and the new token.
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    exclude: Option<Regex>,
}

impl FilterPolicy {
    pub fn new(exclude: Option<Regex>) -> Self {
        Self { exclude }
    }

    /// Build a policy from a user-supplied pattern. Empty means no exclusion.
    pub fn with_pattern(pattern: Option<&str>) -> Result<Self> {
        Ok(Self::new(compile_exclusion(pattern)?))
    }

    pub fn exclusion(&self) -> Option<&Regex> {
        self.exclude.as_ref()
    }

    pub fn matches<P: AsRef<Path>>(&self, path: P) -> bool {
        self.matches_on(path, Local::now().date_naive())
    }

    pub fn matches_on<P: AsRef<Path>>(&self, path: P, today: NaiveDate) -> bool {
        let full = path.as_ref().to_string_lossy();

        if !full.contains(&date_token(today)) {
            return false;
        }

        match &self.exclude {
            Some(regex) => !regex.is_match(&full.to_lowercase()),
            None => true,
        }
    }
}

/// `2023_06` for any day in June 2024.
pub fn date_token(today: NaiveDate) -> String {
    format!("{}_{:02}", today.year() - 1, today.month())
}

pub fn current_date_token() -> String {
    date_token(Local::now().date_naive())
}

/// Compile an exclusion pattern case-insensitively.
pub fn compile_exclusion(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(p) => RegexBuilder::new(p)
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|source| ChangerError::InvalidFilterPattern {
                pattern: p.to_string(),
                source,
            }),
    }
}
