use crate::models::TrackDescriptor;
use anyhow::{Context, Result};
use lofty::prelude::*;
use lofty::read_from_path;
use lofty::tag::ItemKey;
use std::path::Path;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Reads title, artist and duration from an audio file's tags.
/// Missing title falls back to the file stem, missing artist to `UNKNOWN_ARTIST`.
pub fn read_descriptor<P: AsRef<Path>>(path: P) -> Result<TrackDescriptor> {
    let path = path.as_ref();
    let tagged_file = read_from_path(path).context("Failed to read file")?;
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let title = tag
        .and_then(|t| t.get_string(&ItemKey::TrackTitle))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(path));
    let artist = tag
        .and_then(|t| t.get_string(&ItemKey::TrackArtist))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_ARTIST)
        .to_string();

    let duration = tagged_file.properties().duration().as_secs_f64();

    Ok(TrackDescriptor {
        title,
        artist,
        location: path.to_string_lossy().to_string(),
        duration_seconds: if duration.is_finite() { duration } else { 0.0 },
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
