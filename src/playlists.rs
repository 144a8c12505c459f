use crate::db::{clean_playlist_name, Database};
use crate::error::Result;
use crate::models::{Membership, Playlist, Track};
use std::sync::Arc;

/// User-facing playlist operations. Names are trimmed and checked here before
/// they reach the store, which enforces the same rules again.
#[derive(Clone)]
pub struct PlaylistManager {
    db: Arc<Database>,
}

impl PlaylistManager {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, name: &str) -> Result<i64> {
        let name = clean_playlist_name(name)?;
        self.db.create_playlist(name)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.db.delete_playlist(id)
    }

    pub fn rename(&self, id: i64, new_name: &str) -> Result<()> {
        let name = clean_playlist_name(new_name)?;
        self.db.rename_playlist(id, name)
    }

    pub fn get(&self, id: i64) -> Result<Option<Playlist>> {
        self.db.get_playlist(id)
    }

    pub fn list(&self) -> Result<Vec<Playlist>> {
        self.db.list_playlists()
    }

    pub fn add_track(&self, playlist_id: i64, track_id: i64, position: Option<i64>) -> Result<bool> {
        self.db.add_membership(playlist_id, track_id, position)
    }

    /// Appends each track after the current last position, skipping tracks that are
    /// already members. Returns how many were added; nothing is added on error.
    pub fn append_tracks(&self, playlist_id: i64, track_ids: &[i64]) -> Result<usize> {
        self.db.append_memberships(playlist_id, track_ids)
    }

    pub fn remove_track(&self, playlist_id: i64, track_id: i64) -> Result<bool> {
        self.db.remove_membership(playlist_id, track_id)
    }

    pub fn tracks(&self, playlist_id: i64) -> Result<Vec<Track>> {
        self.db.list_playlist_tracks(playlist_id)
    }

    pub fn memberships(&self, playlist_id: i64) -> Result<Vec<Membership>> {
        self.db.list_memberships(playlist_id)
    }
}
