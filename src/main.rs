use clap::Parser;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use remind_wallpaper::{
    cli::{Cli, OutputFormat},
    config::AppConfig,
    ChangerEvent, CommandApplier, FolderWatcher, LogApplier, TomlConfigStore, WallpaperApplier,
    WallpaperChanger, WalkLister,
};

const INITIAL_SCAN_TIMEOUT: Duration = Duration::from_secs(120);

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let app_config = AppConfig::from_env();
    if let Err(err) = app_config.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    let changer = build_changer(&cli, &app_config)?;
    apply_overrides(&cli, &app_config, &changer)?;

    if !changer.is_configured() {
        eprintln!("No photo folders configured. Pass --path <DIR> to add some.");
        std::process::exit(1);
    }

    tracing::info!("Indexing {} folder(s)", changer.configured_paths().len());
    if !changer.wait_for_scans(INITIAL_SCAN_TIMEOUT) {
        tracing::warn!("Initial scan still running, starting anyway");
    }

    if cli.once {
        return run_once(&cli, &changer);
    }

    let _watcher = if cli.watch {
        Some(FolderWatcher::new(
            changer.index().clone(),
            &changer.configured_paths(),
            app_config.scanner.extensions.clone(),
            app_config.watcher.debounce_duration(),
        )?)
    } else {
        None
    };

    run_rotation(&cli, &changer)
}

fn build_changer(cli: &Cli, app_config: &AppConfig) -> Result<WallpaperChanger> {
    let store = TomlConfigStore::open(&cli.settings)
        .with_context(|| format!("Failed to open settings {}", cli.settings.display()))?;
    tracing::debug!("Using settings at {}", store.path().display());

    let applier: Arc<dyn WallpaperApplier> = match cli.apply_cmd.as_deref().and_then(CommandApplier::from_template) {
        Some(applier) => Arc::new(applier),
        None => {
            tracing::info!("No --apply-cmd given, running dry");
            Arc::new(LogApplier)
        }
    };
    let lister = Arc::new(WalkLister::new(app_config.scanner.follow_links));

    WallpaperChanger::new(Box::new(store), lister, applier, app_config)
        .context("Failed to load settings")
}

fn apply_overrides(cli: &Cli, app_config: &AppConfig, changer: &WallpaperChanger) -> Result<()> {
    if let Some(paths) = &cli.paths {
        changer.set_configured_paths(paths)?;
    }
    if let Some(pattern) = &cli.exclude {
        changer.set_exclusion_pattern(Some(pattern.as_str()))?;
    }
    if let Some(ms) = cli.interval_millis() {
        changer.set_interval_millis(app_config.rotation.clamp_interval_ms(ms))?;
    }
    Ok(())
}

fn run_once(cli: &Cli, changer: &WallpaperChanger) -> Result<()> {
    let events = changer.subscribe();
    changer.start()?;

    // The first pick happens right after start
    loop {
        match events.recv_timeout(Duration::from_secs(5)) {
            Ok(ChangerEvent::StateChanged) if changer.last_shown_path().is_some() => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    changer.stop();

    print_status(cli, changer)?;
    Ok(())
}

fn run_rotation(cli: &Cli, changer: &WallpaperChanger) -> Result<()> {
    let events = changer.subscribe();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    changer.start()?;

    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(ChangerEvent::StateChanged) => print_status(cli, changer)?,
            Ok(ChangerEvent::ScanFailed { path, message }) => {
                eprintln!("Scan of {} failed: {}", path, message);
            }
            Ok(ChangerEvent::ApplyFailed { path, message }) => {
                eprintln!("Could not set {}: {}", path.display(), message);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    changer.stop();
    Ok(())
}

fn print_status(cli: &Cli, changer: &WallpaperChanger) -> Result<()> {
    let status = changer.status();
    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&status)?),
        OutputFormat::Compact => {
            if let Some(path) = &status.last_shown {
                println!("{}", path.display());
            }
        }
        OutputFormat::Text => {
            let shown = status
                .last_shown
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "[{}] {} photo(s) available, showing {}",
                if status.running { "running" } else { "stopped" },
                status.available,
                shown
            );
        }
    }
    Ok(())
}
