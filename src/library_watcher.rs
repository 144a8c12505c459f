use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Watches the music folder and calls back once changes have settled.
/// Dropping it stops the watcher and its thread.
pub struct LibraryWatcher {
    watcher: Option<RecommendedWatcher>,
    handle: Option<JoinHandle<()>>,
}

impl LibraryWatcher {
    pub fn start<F>(root: &Path, debounce: Duration, on_change: F) -> notify::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(
            "Watching {:?} for changes (debounce {:?})",
            root, debounce
        );

        let handle = thread::spawn(move || loop {
            match rx.recv() {
                Ok(Ok(event)) if is_relevant(&event) => {
                    debug!("Relevant file system event: {:?}", event);
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => {
                    warn!("Watch error: {:?}", e);
                    continue;
                }
                Err(_) => break,
            }

            // Trailing edge: wait until no event arrives for a full window.
            loop {
                match rx.recv_timeout(debounce) {
                    Ok(_) => continue,
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }

            on_change();
        });

        Ok(Self {
            watcher: Some(watcher),
            handle: Some(handle),
        })
    }
}

impl Drop for LibraryWatcher {
    fn drop(&mut self) {
        // Dropping the watcher closes the channel, which ends the thread.
        self.watcher.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Filters out noise: temp files, locks, partial downloads, plain reads.
fn is_relevant(event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|p| {
        let s = p.to_string_lossy();
        !s.ends_with(".lock") && !s.ends_with(".part") && !s.contains(".tmp")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;

    #[test]
    fn temp_and_lock_files_are_ignored() {
        let tmp = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/music/song.mp3.tmp"));
        let lock = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/music/.library.lock"));
        assert!(!is_relevant(&tmp));
        assert!(!is_relevant(&lock));
    }

    #[test]
    fn audio_changes_are_relevant_but_reads_are_not() {
        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/music/new.flac"));
        let read = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/music/new.flac"));
        assert!(is_relevant(&created));
        assert!(!is_relevant(&read));
    }

    #[test]
    fn burst_of_writes_fires_one_callback_and_drop_stops_thread() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let watcher = LibraryWatcher::start(dir.path(), Duration::from_millis(300), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for i in 0..5 {
            std::fs::write(dir.path().join(format!("{i}.mp3")), b"audio").unwrap();
        }

        // Settle window plus generous slack for slow CI.
        thread::sleep(Duration::from_millis(1500));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            drop(watcher);
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
