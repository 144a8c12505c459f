use crate::error::{conflict_or_storage, CatalogError, Result};
use crate::models::{Membership, Playlist, SyncReport, Track, TrackDescriptor};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const DB_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        file_path TEXT NOT NULL UNIQUE,
        duration REAL DEFAULT 0,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS playlists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS playlist_songs (
        playlist_id INTEGER NOT NULL,
        song_id INTEGER NOT NULL,
        position INTEGER,
        PRIMARY KEY (playlist_id, song_id),
        FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
        FOREIGN KEY (song_id) REFERENCES songs(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_playlist_songs_song ON playlist_songs(song_id);
"#;

const TRACK_COLUMNS: &str = "s.id, s.title, s.artist, s.file_path, s.duration, s.created_at";

// Positioned rows first, then title, then id so equal titles keep insertion order.
const MEMBERSHIP_ORDER: &str = "ps.position IS NULL, ps.position ASC, s.title ASC, s.id ASC";

/// Durable catalog of songs, playlists and playlist membership.
///
/// One SQLite connection behind a mutex: every call holds the lock for its whole
/// duration, so writers are serialized and readers always see a committed state.
/// Share it between threads through an `Arc`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let db = Self::from_connection(conn)?;

        info!(
            "Opened catalog at {:?}: {} tracks, {} playlists",
            path,
            db.track_count()?,
            db.list_playlists()?.len()
        );
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(DB_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::LockPoisoned)
    }

    /// Runs `f` inside an immediate transaction. Commits on `Ok`; any error drops
    /// the transaction, which rolls it back.
    fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ─── Tracks ──────────────────────────────────────────────────────

    /// Brings the `songs` table into exact correspondence with `descriptors`,
    /// keyed by location. All or nothing.
    pub fn reconcile_tracks(&self, descriptors: &[TrackDescriptor]) -> Result<SyncReport> {
        for descriptor in descriptors {
            validate_descriptor(descriptor)?;
        }

        self.write(|tx| {
            let mut report = SyncReport::default();

            tx.execute_batch(
                "CREATE TEMP TABLE IF NOT EXISTS sync_paths (file_path TEXT PRIMARY KEY);
                 DELETE FROM temp.sync_paths;",
            )?;

            {
                let mut find = tx.prepare_cached(
                    "SELECT id, title, artist, duration FROM songs WHERE file_path = ?1",
                )?;
                let mut insert = tx.prepare_cached(
                    "INSERT INTO songs (title, artist, file_path, duration) VALUES (?1, ?2, ?3, ?4)",
                )?;
                let mut update = tx.prepare_cached(
                    "UPDATE songs SET title = ?1, artist = ?2, duration = ?3 WHERE id = ?4",
                )?;
                let mut keep = tx.prepare_cached(
                    "INSERT OR IGNORE INTO temp.sync_paths (file_path) VALUES (?1)",
                )?;

                for d in descriptors {
                    let existing = find
                        .query_row(params![d.location], |row| {
                            Ok((
                                row.get::<_, i64>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, Option<f64>>(3)?,
                            ))
                        })
                        .optional()?;

                    match existing {
                        None => {
                            insert
                                .execute(params![d.title, d.artist, d.location, d.duration_seconds])
                                .map_err(|e| {
                                    conflict_or_storage(e, || {
                                        format!("track location already exists: {}", d.location)
                                    })
                                })?;
                            report.inserted += 1;
                        }
                        Some((id, title, artist, duration))
                            if title != d.title
                                || artist != d.artist
                                || duration != Some(d.duration_seconds) =>
                        {
                            update.execute(params![d.title, d.artist, d.duration_seconds, id])?;
                            report.updated += 1;
                        }
                        Some(_) => report.unchanged += 1,
                    }

                    keep.execute(params![d.location])?;
                }
            }

            report.removed = tx.execute(
                "DELETE FROM songs WHERE file_path NOT IN (SELECT file_path FROM temp.sync_paths)",
                [],
            )?;
            tx.execute("DELETE FROM temp.sync_paths", [])?;

            Ok(report)
        })
    }

    pub fn list_tracks(&self) -> Result<Vec<Track>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM songs s ORDER BY s.title ASC, s.id ASC"
        ))?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(tracks)
    }

    pub fn get_track(&self, id: i64) -> Result<Option<Track>> {
        let conn = self.lock()?;
        let track = conn
            .query_row(
                &format!("SELECT {TRACK_COLUMNS} FROM songs s WHERE s.id = ?1"),
                params![id],
                track_from_row,
            )
            .optional()?;
        Ok(track)
    }

    pub fn track_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count)
    }

    // ─── Playlists ───────────────────────────────────────────────────

    pub fn create_playlist(&self, name: &str) -> Result<i64> {
        let cleaned = clean_playlist_name(name)?;
        let id = self.write(|tx| {
            tx.execute("INSERT INTO playlists (name) VALUES (?1)", params![cleaned])
                .map_err(|e| {
                    conflict_or_storage(e, || format!("playlist name already exists: {}", cleaned))
                })?;
            Ok(tx.last_insert_rowid())
        })?;
        info!("Created playlist {} ({:?})", id, cleaned);
        Ok(id)
    }

    /// Deletes the playlist and, through the foreign key, its memberships.
    /// Deleting an unknown id is a no-op.
    pub fn delete_playlist(&self, id: i64) -> Result<()> {
        let deleted = self.write(|tx| {
            Ok(tx.execute("DELETE FROM playlists WHERE id = ?1", params![id])?)
        })?;
        if deleted > 0 {
            info!("Deleted playlist {}", id);
        }
        Ok(())
    }

    pub fn rename_playlist(&self, id: i64, new_name: &str) -> Result<()> {
        let cleaned = clean_playlist_name(new_name)?;
        self.write(|tx| {
            tx.execute(
                "UPDATE playlists SET name = ?1 WHERE id = ?2",
                params![cleaned, id],
            )
            .map_err(|e| {
                conflict_or_storage(e, || format!("playlist name already exists: {}", cleaned))
            })?;
            Ok(())
        })
    }

    pub fn get_playlist(&self, id: i64) -> Result<Option<Playlist>> {
        let conn = self.lock()?;
        let playlist = conn
            .query_row(
                "SELECT id, name, created_at FROM playlists WHERE id = ?1",
                params![id],
                playlist_from_row,
            )
            .optional()?;
        Ok(playlist)
    }

    pub fn list_playlists(&self) -> Result<Vec<Playlist>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM playlists ORDER BY name ASC, id ASC")?;
        let playlists = stmt
            .query_map([], playlist_from_row)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(playlists)
    }

    // ─── Membership ──────────────────────────────────────────────────

    /// Adds `track_id` to `playlist_id`. Re-adding an existing pair leaves its
    /// stored position untouched. Returns whether a row was inserted.
    pub fn add_membership(
        &self,
        playlist_id: i64,
        track_id: i64,
        position: Option<i64>,
    ) -> Result<bool> {
        let inserted = self.write(|tx| {
            ensure_exists(tx, "playlists", "playlist", playlist_id)?;
            ensure_exists(tx, "songs", "track", track_id)?;
            let changed = tx.execute(
                "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id, position) VALUES (?1, ?2, ?3)",
                params![playlist_id, track_id, position],
            )?;
            Ok(changed > 0)
        })?;
        debug!(
            "add_membership playlist={} track={} position={:?} inserted={}",
            playlist_id, track_id, position, inserted
        );
        Ok(inserted)
    }

    pub fn remove_membership(&self, playlist_id: i64, track_id: i64) -> Result<bool> {
        let removed = self.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2",
                params![playlist_id, track_id],
            )?)
        })?;
        debug!(
            "remove_membership playlist={} track={} removed={}",
            playlist_id, track_id, removed
        );
        Ok(removed > 0)
    }

    /// Appends tracks after the playlist's highest position, skipping existing
    /// members. All or nothing: an unknown track leaves the playlist untouched.
    pub fn append_memberships(&self, playlist_id: i64, track_ids: &[i64]) -> Result<usize> {
        let added = self.write(|tx| {
            ensure_exists(tx, "playlists", "playlist", playlist_id)?;
            for &track_id in track_ids {
                ensure_exists(tx, "songs", "track", track_id)?;
            }

            let last: Option<i64> = tx.query_row(
                "SELECT MAX(position) FROM playlist_songs WHERE playlist_id = ?1",
                params![playlist_id],
                |row| row.get(0),
            )?;
            let mut next = last.map_or(0, |last| last + 1);

            let mut insert = tx.prepare_cached(
                "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id, position) VALUES (?1, ?2, ?3)",
            )?;
            let mut added = 0;
            for &track_id in track_ids {
                if insert.execute(params![playlist_id, track_id, next])? > 0 {
                    next += 1;
                    added += 1;
                }
            }
            Ok(added)
        })?;
        debug!(
            "append_memberships playlist={} requested={} added={}",
            playlist_id,
            track_ids.len(),
            added
        );
        Ok(added)
    }

    /// Tracks of a playlist; empty when the playlist does not exist.
    pub fn list_playlist_tracks(&self, playlist_id: i64) -> Result<Vec<Track>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS}
             FROM playlist_songs ps
             JOIN songs s ON s.id = ps.song_id
             WHERE ps.playlist_id = ?1
             ORDER BY {MEMBERSHIP_ORDER}"
        ))?;
        let tracks = stmt
            .query_map(params![playlist_id], track_from_row)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(tracks)
    }

    pub fn list_memberships(&self, playlist_id: i64) -> Result<Vec<Membership>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT ps.playlist_id, ps.song_id, ps.position
             FROM playlist_songs ps
             JOIN songs s ON s.id = ps.song_id
             WHERE ps.playlist_id = ?1
             ORDER BY {MEMBERSHIP_ORDER}"
        ))?;
        let memberships = stmt
            .query_map(params![playlist_id], |row| {
                Ok(Membership {
                    playlist_id: row.get(0)?,
                    track_id: row.get(1)?,
                    position: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(memberships)
    }
}

/// Trims a user-supplied playlist name, rejecting blank ones.
pub fn clean_playlist_name(name: &str) -> Result<&str> {
    let cleaned = name.trim();
    if cleaned.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "Playlist name cannot be empty".to_string(),
        ));
    }
    Ok(cleaned)
}

fn validate_descriptor(d: &TrackDescriptor) -> Result<()> {
    if d.location.trim().is_empty() {
        return Err(CatalogError::InvalidArgument(format!(
            "track {:?} has an empty location",
            d.title
        )));
    }
    if !d.duration_seconds.is_finite() || d.duration_seconds < 0.0 {
        return Err(CatalogError::InvalidArgument(format!(
            "track {} has invalid duration {}",
            d.location, d.duration_seconds
        )));
    }
    Ok(())
}

fn ensure_exists(tx: &Transaction<'_>, table: &str, entity: &'static str, id: i64) -> Result<()> {
    let found = tx
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE id = ?1"),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    found.ok_or(CatalogError::NotFound { entity, id })
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    let created_at: NaiveDateTime = row.get(5)?;
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        location: row.get(3)?,
        duration_seconds: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
        created_at: created_at.and_utc(),
    })
}

fn playlist_from_row(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    let created_at: NaiveDateTime = row.get(2)?;
    Ok(Playlist {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: created_at.and_utc(),
    })
}
