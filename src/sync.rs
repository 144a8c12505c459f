use crate::db::Database;
use crate::error::Result;
use crate::library_scanner::scan_folder;
pub use crate::models::SyncReport;
use crate::models::TrackDescriptor;
use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Keeps the catalog's track set equal to what the scanner last saw on disk.
#[derive(Clone)]
pub struct Synchronizer {
    db: Arc<Database>,
}

impl Synchronizer {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Upserts every descriptor by location and prunes tracks missing from
    /// `snapshot`. An empty snapshot empties the catalog.
    pub fn reconcile(&self, snapshot: &[TrackDescriptor]) -> Result<SyncReport> {
        let descriptors = collapse_duplicates(snapshot);
        let report = self.db.reconcile_tracks(&descriptors)?;
        info!(
            "Reconciled {} tracks: {} inserted, {} updated, {} unchanged, {} removed",
            descriptors.len(),
            report.inserted,
            report.updated,
            report.unchanged,
            report.removed
        );
        Ok(report)
    }

    /// Scans `root` for audio files and reconciles the catalog against the result.
    pub fn sync_folder(&self, root: &Path, extensions: &[String]) -> anyhow::Result<SyncReport> {
        let snapshot = scan_folder(root, extensions)
            .with_context(|| format!("Failed to scan {}", root.display()))?;
        let report = self.reconcile(&snapshot).context("Failed to reconcile catalog")?;
        Ok(report)
    }
}

/// Keeps one descriptor per location, the last one seen winning, in first-seen order.
fn collapse_duplicates(snapshot: &[TrackDescriptor]) -> Vec<TrackDescriptor> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(snapshot.len());
    let mut out: Vec<TrackDescriptor> = Vec::with_capacity(snapshot.len());
    for d in snapshot {
        match index.get(d.location.as_str()) {
            Some(&i) => out[i] = d.clone(),
            None => {
                index.insert(d.location.as_str(), out.len());
                out.push(d.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;

    fn sync() -> (Arc<Database>, Synchronizer) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (db.clone(), Synchronizer::new(db))
    }

    #[test]
    fn duplicate_locations_collapse_to_last_occurrence() {
        let (db, sync) = sync();
        let report = sync
            .reconcile(&[
                TrackDescriptor::new("First", "A", "/x.mp3", 1.0),
                TrackDescriptor::new("Other", "B", "/y.mp3", 2.0),
                TrackDescriptor::new("Second", "A", "/x.mp3", 3.0),
            ])
            .unwrap();
        assert_eq!(report.inserted, 2);

        let tracks = db.list_tracks().unwrap();
        assert_eq!(tracks.len(), 2);
        let x = tracks.iter().find(|t| t.location == "/x.mp3").unwrap();
        assert_eq!(x.title, "Second");
        assert_eq!(x.duration_seconds, 3.0);
    }

    #[test]
    fn negative_duration_is_rejected_and_nothing_changes() {
        let (db, sync) = sync();
        sync.reconcile(&[TrackDescriptor::new("Keep", "A", "/keep.mp3", 10.0)])
            .unwrap();

        let err = sync
            .reconcile(&[TrackDescriptor::new("Bad", "A", "/bad.mp3", -1.0)])
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument(_)));
        assert_eq!(db.list_tracks().unwrap()[0].location, "/keep.mp3");
    }

    #[test]
    fn sync_folder_on_empty_directory_clears_catalog() {
        let (db, sync) = sync();
        sync.reconcile(&[TrackDescriptor::new("Gone", "A", "/gone.mp3", 1.0)])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let report = sync
            .sync_folder(dir.path(), &["mp3".to_string()])
            .unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(db.track_count().unwrap(), 0);
    }
}
