//! Single-slot folder watcher with notify-debouncer-mini

use crate::{FsError, ItemPath, Result, WatchCallback};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use parking_lot::Mutex;
use std::time::Duration;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches at most one folder at a time.
///
/// Installing a new watch drops the previous debouncer, which stops it.
pub struct FolderWatcher {
    debounce: Duration,
    current: Mutex<Option<(ItemPath, Debouncer<RecommendedWatcher>)>>,
}

impl FolderWatcher {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            current: Mutex::new(None),
        }
    }

    /// Watch `path` (non-recursive), replacing any existing watch
    pub fn watch(&self, path: &ItemPath, callback: WatchCallback) -> Result<()> {
        let mut current = self.current.lock();
        // Stop the old watch before the new one can fire
        current.take();

        let watched = path.clone();
        let mut debouncer = new_debouncer(self.debounce, move |result: DebounceEventResult| {
            match result {
                Ok(events) if !events.is_empty() => {
                    tracing::trace!("{} change(s) in {}", events.len(), watched);
                    callback();
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Watcher error: {:?}", e),
            }
        })
        .map_err(|e| FsError::Unclassified(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&path.to_native(), RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(e, path))?;

        tracing::info!("Watching: {}", path);
        *current = Some((path.clone(), debouncer));
        Ok(())
    }

    /// Currently watched folder
    pub fn watched(&self) -> Option<ItemPath> {
        self.current.lock().as_ref().map(|(path, _)| path.clone())
    }

    pub fn unwatch(&self) {
        if let Some((path, _)) = self.current.lock().take() {
            tracing::info!("Unwatched: {}", path);
        }
    }
}

impl Default for FolderWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

fn watch_error(err: notify::Error, path: &ItemPath) -> FsError {
    match err.kind {
        notify::ErrorKind::Io(io) => FsError::from_io(io, path),
        notify::ErrorKind::PathNotFound => FsError::at(crate::FsErrorKind::NotExists, path),
        _ => FsError::Unclassified(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_watch_replaces_previous() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let watcher = FolderWatcher::new(Duration::from_millis(20));

        let a = ItemPath::from_native(first.path(), true);
        let b = ItemPath::from_native(second.path(), true);

        watcher.watch(&a, Arc::new(|| {})).unwrap();
        assert_eq!(watcher.watched(), Some(a));

        watcher.watch(&b, Arc::new(|| {})).unwrap();
        assert_eq!(watcher.watched(), Some(b));

        watcher.unwatch();
        assert_eq!(watcher.watched(), None);
    }

    #[test]
    fn test_watch_fires_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = FolderWatcher::new(Duration::from_millis(20));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        watcher
            .watch(
                &ItemPath::from_native(dir.path(), true),
                Arc::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        std::fs::write(dir.path().join("new.txt"), "x").unwrap();

        for _ in 0..100 {
            if calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_watch_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ItemPath::from_native(dir.path().join("missing"), true);
        let watcher = FolderWatcher::default();

        let err = watcher.watch(&missing, Arc::new(|| {})).unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));
        assert_eq!(watcher.watched(), None);
    }
}
