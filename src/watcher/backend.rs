//! Collaborators the watcher drives: the native watch layer and the
//! directory walker used for recursive registration.

use std::path::Path;

use crossbeam_channel::{Sender, TrySendError};
use notify::{RecursiveMode, Watcher};
use walkdir::WalkDir;

use super::{FileEvent, WatchError};

/// Starts and stops native observation of individual paths.
///
/// Implementations own the producing side of the raw event channel.
/// Dropping the backend must release that sender so the dispatch loop can
/// observe shutdown.
pub trait WatchBackend: Send {
    /// Begin observing `path` (non-recursive).
    fn start_watch(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Stop observing `path`.
    fn stop_watch(&mut self, path: &Path) -> Result<(), WatchError>;
}

/// Visits every path in a directory subtree.
pub trait TreeWalker: Send + Sync {
    /// Call `visit` for `root` and each entry beneath it.
    ///
    /// The first error, from the traversal or from `visit`, aborts the walk
    /// and is returned.
    fn walk(
        &self,
        root: &Path,
        visit: &mut dyn FnMut(&Path) -> Result<(), WatchError>,
    ) -> Result<(), WatchError>;
}

/// Backend on top of `notify::RecommendedWatcher`.
///
/// The native callback classifies each event and does a blocking send into
/// the raw channel, so a stalled dispatch loop throttles the OS watcher.
/// Native errors go to a separate channel and are dropped when it is full.
pub struct NotifyBackend {
    watcher: notify::RecommendedWatcher,
}

impl NotifyBackend {
    /// Create the native watcher feeding `events` and `errors`.
    pub fn new(events: Sender<FileEvent>, errors: Sender<WatchError>) -> Result<Self, WatchError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for file_event in FileEvent::from_notify(event) {
                        if events.send(file_event).is_err() {
                            // Dispatch loop is gone
                            return;
                        }
                    }
                }
                Err(e) => {
                    let err = WatchError::EventError {
                        details: e.to_string(),
                    };
                    if let Err(TrySendError::Full(err)) = errors.try_send(err) {
                        tracing::warn!("[watcher] error queue full, dropping: {err}");
                    }
                }
            }
        })?;

        Ok(Self { watcher })
    }
}

impl WatchBackend for NotifyBackend {
    fn start_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::watch_failed(path, e))
    }

    fn stop_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .unwatch(path)
            .map_err(|e| WatchError::unwatch_failed(path, e))
    }
}

/// Pre-order subtree walk using `walkdir`, root first, entries sorted by
/// file name.
#[derive(Debug, Clone, Default)]
pub struct WalkdirWalker {
    follow_symlinks: bool,
}

impl WalkdirWalker {
    pub fn new(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }
}

impl TreeWalker for WalkdirWalker {
    fn walk(
        &self,
        root: &Path,
        visit: &mut dyn FnMut(&Path) -> Result<(), WatchError>,
    ) -> Result<(), WatchError> {
        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| WatchError::Walk {
                path: e.path().unwrap_or(root).to_path_buf(),
                reason: e.to_string(),
            })?;
            visit(entry.path())?;
        }

        Ok(())
    }
}
