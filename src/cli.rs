use std::path::PathBuf;
use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "remind-wallpaper")]
#[command(author = "RemindWallpaper Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Rotates the wallpaper through photos taken in this month one year ago")]
#[command(long_about = "RemindWallpaper indexes your photo folders, keeps the photos whose path contains last year's YYYY_MM for the current month, and periodically sets a random one as the desktop wallpaper.")]
pub struct Cli {
    /// Settings file holding folders, exclusion pattern and interval
    #[arg(long, env = "REMIND_WALLPAPER_SETTINGS", default_value = "remind-wallpaper.toml")]
    pub settings: PathBuf,

    /// Replace the configured photo folders
    #[arg(long = "path", value_name = "DIR", value_delimiter = ';', help = "Photo folder (repeatable or ';'-separated)")]
    pub paths: Option<Vec<String>>,

    /// Replace the exclusion pattern; an empty string clears it
    #[arg(long, value_name = "REGEX", help = "Exclude photos whose path matches")]
    pub exclude: Option<String>,

    /// Seconds between wallpaper changes
    #[arg(long, value_name = "SECS", help = "Rotation interval in seconds")]
    pub interval: Option<u64>,

    /// Command used to set the wallpaper; `{}` is replaced by the photo path
    #[arg(long, value_name = "TEMPLATE", help = "e.g. \"feh --bg-fill {}\" (dry run when absent)")]
    pub apply_cmd: Option<String>,

    /// Rescan when photos are added or removed
    #[arg(long, help = "Watch photo folders for changes")]
    pub watch: bool,

    /// Show one photo and exit
    #[arg(long, help = "Apply a single photo and exit")]
    pub once: bool,

    /// Output format for state changes
    #[arg(long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines (default)
    Text,
    /// JSON status objects for scripting
    Json,
    /// Only the path of each shown photo
    Compact,
}

impl Cli {
    pub fn interval_millis(&self) -> Option<u64> {
        self.interval.map(|secs| secs.saturating_mul(1000))
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(paths) = &self.paths {
            for path in paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
                if !std::path::Path::new(path).is_dir() {
                    return Err(format!("Path is not a directory: {}", path));
                }
            }
        }

        if self.interval == Some(0) {
            return Err("Interval must be greater than 0".to_string());
        }

        if let Some(cmd) = &self.apply_cmd {
            if cmd.trim().is_empty() {
                return Err("Apply command must not be empty".to_string());
            }
        }

        Ok(())
    }
}
