pub mod config;
pub mod db;
pub mod error;
pub mod library_scanner;
pub mod library_watcher;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod playlists;
pub mod sync;

pub use config::CatalogConfig;
pub use db::Database;
pub use error::{CatalogError, Result};
pub use models::{Membership, Playlist, SyncReport, Track, TrackDescriptor};
pub use playlists::PlaylistManager;
pub use sync::Synchronizer;

use std::path::Path;
use std::sync::Arc;

/// One store shared by the synchronizer and the playlist manager.
#[derive(Clone)]
pub struct Catalog {
    pub db: Arc<Database>,
    pub sync: Synchronizer,
    pub playlists: PlaylistManager,
}

impl Catalog {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Ok(Self::with_database(Database::new(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    fn with_database(db: Database) -> Self {
        let db = Arc::new(db);
        Self {
            sync: Synchronizer::new(db.clone()),
            playlists: PlaylistManager::new(db.clone()),
            db,
        }
    }
}
