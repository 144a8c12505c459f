use crate::metadata::read_descriptor;
use crate::models::TrackDescriptor;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walks `root` and returns a descriptor for every readable audio file whose
/// extension is in `extensions`, sorted by location.
pub fn scan_folder<P: AsRef<Path>>(root: P, extensions: &[String]) -> Result<Vec<TrackDescriptor>> {
    let root = root
        .as_ref()
        .canonicalize()
        .with_context(|| format!("Music folder not found: {}", root.as_ref().display()))?;

    let mut tracks = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_audio_extension(entry.path(), extensions) {
            continue;
        }

        // Canonical path is the catalog's identity for the file.
        let path = match entry.path().canonicalize() {
            Ok(path) => path,
            Err(_) => entry.path().to_path_buf(),
        };

        match read_descriptor(&path) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                skipped += 1;
                warn!("Skipping {:?}: {:#}", path, e);
            }
        }
    }

    tracks.sort_by(|a, b| a.location.cmp(&b.location));
    debug!(
        "Scanned {:?}: {} tracks, {} unreadable",
        root,
        tracks.len(),
        skipped
    );
    Ok(tracks)
}

fn has_audio_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)))
}
