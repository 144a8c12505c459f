use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Track {
    pub id: i64,           // Database ID, stable for the row's lifetime
    pub title: String,
    pub artist: String,
    pub location: String,  // Absolute file path, unique
    pub duration_seconds: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub playlist_id: i64,
    pub track_id: i64,
    pub position: Option<i64>,
}

/// What the scanner hands over for a single file on disk.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    pub location: String,
    #[serde(default)]
    pub duration_seconds: f64,
}

impl TrackDescriptor {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        location: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            location: location.into(),
            duration_seconds,
        }
    }
}

/// Outcome counts of one reconciliation run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
}
