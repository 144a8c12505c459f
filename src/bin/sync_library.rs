use anyhow::{Context, Result};
use songshelf::library_watcher::LibraryWatcher;
use songshelf::logging::{init_logging, LoggingConfig};
use songshelf::{Catalog, CatalogConfig};
use std::env;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use tracing::error;

const USAGE: &str = "Usage: sync_library [--config <file>] [--watch] [music_dir] [db_path]";

fn main() -> Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut watch = false;
    let mut positional = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(args.next().map(PathBuf::from).context(USAGE)?);
            }
            "--watch" => watch = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let mut config = CatalogConfig::load(config_path.as_deref())?;
    let mut positional = positional.into_iter();
    if let Some(music_dir) = positional.next() {
        config.music_dir = music_dir;
    }
    if let Some(db_path) = positional.next() {
        config.db_path = db_path;
    }

    init_logging(&LoggingConfig {
        log_dir: config.log_dir.clone(),
        debug: config.debug,
    })?;

    let catalog = Catalog::open(&config.db_path)
        .with_context(|| format!("Failed to open catalog {}", config.db_path.display()))?;

    println!("Scanning songs in: {}", config.music_dir.display());
    let report = catalog.sync.sync_folder(&config.music_dir, &config.extensions)?;
    println!(
        "Inserted {}, updated {}, unchanged {}, removed {} ({} tracks in catalog)",
        report.inserted,
        report.updated,
        report.unchanged,
        report.removed,
        catalog.db.track_count()?
    );

    if !watch {
        return Ok(());
    }

    let (tx, rx) = channel::<()>();
    let _watcher = LibraryWatcher::start(&config.music_dir, config.watch_debounce(), move || {
        let _ = tx.send(());
    })?;

    while rx.recv().is_ok() {
        match catalog.sync.sync_folder(&config.music_dir, &config.extensions) {
            Ok(report) => println!(
                "Resynced: +{} ~{} -{}",
                report.inserted, report.updated, report.removed
            ),
            Err(e) => error!("Resync failed: {:#}", e),
        }
    }
    Ok(())
}
