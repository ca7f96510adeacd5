use std::path::Path;
use std::process::Command;
use crate::error::{ChangerError, Result};

/// Sets the desktop wallpaper. Failures are soft; the rotation loop logs them and moves on.
pub trait WallpaperApplier: Send + Sync {
    fn apply(&self, path: &Path) -> Result<()>;
}

/// Runs a user command such as `feh --bg-fill {}`. `{}` is replaced by the
/// photo path; without a placeholder the path is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandApplier {
    program: String,
    args: Vec<String>,
}

impl CommandApplier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a template on whitespace. Returns `None` for an empty template.
    pub fn from_template(template: &str) -> Option<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn command_line(&self, path: &Path) -> (String, Vec<String>) {
        let path = path.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains("{}") {
                    substituted = true;
                    arg.replace("{}", &path)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(path.into_owned());
        }
        (self.program.clone(), args)
    }
}

impl WallpaperApplier for CommandApplier {
    fn apply(&self, path: &Path) -> Result<()> {
        let (program, args) = self.command_line(path);
        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(|err| ChangerError::Apply {
                path: path.to_path_buf(),
                message: format!("failed to run {}: {}", program, err),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ChangerError::Apply {
                path: path.to_path_buf(),
                message: format!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }
}

/// Dry run: only logs what would be shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogApplier;

impl WallpaperApplier for LogApplier {
    fn apply(&self, path: &Path) -> Result<()> {
        tracing::info!("Would show {}", path.display());
        Ok(())
    }
}
