//! Subscription watcher: registration calls and the public event stream.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

use crate::config::WatcherConfig;

use super::backend::{NotifyBackend, TreeWalker, WalkdirWalker, WatchBackend};
use super::dispatch::{DispatchStats, Dispatcher};
use super::{EventFlags, FileEvent, InterestRegistry, WatchError};

/// Filesystem watcher that forwards only subscribed event categories.
///
/// Registration calls run on the caller's thread and only touch the
/// registry and the backend. A dedicated thread filters the raw events and
/// feeds [`events`](Self::events). The stream closes once the backend is
/// gone and every buffered event has been handled.
///
/// Registration calls can block while the stream is unread: the native
/// backend serves them on the same thread that delivers raw events, and
/// that thread waits for room in the raw channel. Consume
/// [`events`](Self::events) from another thread before registering paths
/// on a busy tree.
pub struct FsWatcher<B: WatchBackend = NotifyBackend> {
    /// Shared with the dispatch thread.
    registry: Arc<InterestRegistry>,
    /// `None` after [`close`](Self::close).
    backend: Mutex<Option<B>>,
    /// Traversal for recursive registration.
    walker: Box<dyn TreeWalker>,
    /// Forwarded events.
    events: Receiver<FileEvent>,
    /// Errors reported by the native watcher.
    errors: Receiver<WatchError>,
    dispatcher: JoinHandle<DispatchStats>,
}

impl FsWatcher<NotifyBackend> {
    /// Create a watcher on the native backend with default settings.
    pub fn new() -> Result<Self, WatchError> {
        FsWatcherBuilder::new().build()
    }

    /// Create a builder for configuring the watcher.
    pub fn builder() -> FsWatcherBuilder {
        FsWatcherBuilder::new()
    }
}

impl<B: WatchBackend> FsWatcher<B> {
    /// Watch `path` for every category.
    pub fn watch(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        self.watch_flags(path, EventFlags::ALL_FLAGS)
    }

    /// Watch `path` for the given categories.
    ///
    /// The mask is recorded before the backend is asked to observe the path
    /// and stays recorded if that request fails. May block while
    /// [`events`](Self::events) is unread.
    pub fn watch_flags(&self, path: impl AsRef<Path>, flags: EventFlags) -> Result<(), WatchError> {
        let path = path.as_ref();
        self.ensure_open()?;

        self.registry.set(path, flags);
        crate::debug_event!("watcher", "watch", "{} [{flags}]", path.display());

        self.with_backend(|backend| backend.start_watch(path))
    }

    /// Watch `path` and everything beneath it for every category.
    pub fn watch_all(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        self.watch_subtree(path.as_ref(), EventFlags::ALL_FLAGS)
    }

    /// Watch `path` and everything beneath it for the given categories.
    ///
    /// Every visited path gets the same mask. Paths created later directly
    /// inside a visited directory inherit that mask, unless they were
    /// removed or deleted before. Blocks like [`watch_flags`](Self::watch_flags).
    pub fn watch_all_flags(
        &self,
        path: impl AsRef<Path>,
        flags: EventFlags,
    ) -> Result<(), WatchError> {
        self.watch_subtree(path.as_ref(), flags)
    }

    /// Stop watching `path`.
    ///
    /// The registry entry is removed even if the backend fails to stop.
    pub fn remove_watch(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        let path = path.as_ref();

        self.registry.remove(path);
        crate::debug_event!("watcher", "unwatch", "{}", path.display());

        self.with_backend(|backend| backend.stop_watch(path))
    }

    /// Forwarded events. Iteration ends when the watcher shuts down.
    pub fn events(&self) -> &Receiver<FileEvent> {
        &self.events
    }

    /// Errors reported by the native watch layer.
    pub fn errors(&self) -> &Receiver<WatchError> {
        &self.errors
    }

    pub fn registry(&self) -> &Arc<InterestRegistry> {
        &self.registry
    }

    /// Current mask for `path` (empty if not watched).
    pub fn flags_for(&self, path: impl AsRef<Path>) -> EventFlags {
        self.registry.get(path.as_ref())
    }

    pub fn is_watched(&self, path: impl AsRef<Path>) -> bool {
        self.registry.contains(path.as_ref())
    }

    pub fn is_closed(&self) -> bool {
        self.backend.lock().is_none()
    }

    /// Release the backend, closing the raw event source it owns.
    ///
    /// Events already buffered are still delivered; the stream closes
    /// afterwards. Further registration calls fail with
    /// [`WatchError::Closed`]. Calling this twice is harmless.
    pub fn close(&self) {
        if self.backend.lock().take().is_some() {
            crate::debug_event!("watcher", "closed");
        }
    }

    /// Close the watcher and wait for the dispatch loop to finish.
    ///
    /// Unread events are discarded. Blocks until every producer of raw
    /// events is gone.
    pub fn join(self) -> Result<DispatchStats, WatchError> {
        let FsWatcher {
            backend,
            events,
            dispatcher,
            ..
        } = self;

        drop(backend.into_inner());
        drop(events);

        let stats = dispatcher.join().map_err(|_| WatchError::DispatchFailed)?;
        crate::log_event!(
            "watcher",
            "stopped",
            "{} received, {} forwarded, {} suppressed",
            stats.received,
            stats.forwarded,
            stats.suppressed
        );
        Ok(stats)
    }

    fn watch_subtree(&self, root: &Path, flags: EventFlags) -> Result<(), WatchError> {
        self.ensure_open()?;

        let mut count = 0usize;
        self.walker.walk(root, &mut |path| {
            self.registry.set_subtree(path, flags);
            count += 1;
            self.with_backend(|backend| backend.start_watch(path))
        })?;

        crate::log_event!(
            "watcher",
            "watching",
            "{count} paths under {} [{flags}]",
            root.display()
        );
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), WatchError> {
        if self.is_closed() {
            return Err(WatchError::Closed);
        }
        Ok(())
    }

    fn with_backend<T>(
        &self,
        f: impl FnOnce(&mut B) -> Result<T, WatchError>,
    ) -> Result<T, WatchError> {
        let mut guard = self.backend.lock();
        let backend = guard.as_mut().ok_or(WatchError::Closed)?;
        f(backend).inspect_err(|e| tracing::warn!("[watcher] {e}"))
    }
}

/// Builder for constructing an [`FsWatcher`].
pub struct FsWatcherBuilder {
    registry: Option<Arc<InterestRegistry>>,
    walker: Option<Box<dyn TreeWalker>>,
    raw_capacity: usize,
    output_capacity: usize,
    error_capacity: usize,
    follow_symlinks: bool,
}

impl FsWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            registry: None,
            walker: None,
            raw_capacity: 0,
            output_capacity: 0,
            error_capacity: 0,
            follow_symlinks: false,
        }
        .config(&WatcherConfig::default())
    }

    /// Take capacities and traversal options from config.
    pub fn config(mut self, config: &WatcherConfig) -> Self {
        self.raw_capacity = config.raw_capacity;
        self.output_capacity = config.output_capacity;
        self.error_capacity = config.error_capacity;
        self.follow_symlinks = config.follow_symlinks;
        self
    }

    /// Share an existing registry instead of creating one.
    pub fn registry(mut self, registry: Arc<InterestRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the subtree walker used by the recursive registration calls.
    pub fn walker(mut self, walker: impl TreeWalker + 'static) -> Self {
        self.walker = Some(Box::new(walker));
        self
    }

    /// Set how many raw events may queue before the backend blocks.
    pub fn raw_capacity(mut self, capacity: usize) -> Self {
        self.raw_capacity = capacity;
        self
    }

    /// Set how many forwarded events may queue before dispatch blocks.
    pub fn output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    /// Set how many native errors are kept until read.
    pub fn error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }

    /// Build a watcher on the native backend.
    pub fn build(self) -> Result<FsWatcher<NotifyBackend>, WatchError> {
        self.build_with(NotifyBackend::new)
    }

    /// Build a watcher on a custom backend.
    ///
    /// `make_backend` receives the raw event sender and the error sender.
    /// The raw stream ends when every clone of that sender is dropped.
    pub fn build_with<B, F>(self, make_backend: F) -> Result<FsWatcher<B>, WatchError>
    where
        B: WatchBackend,
        F: FnOnce(Sender<FileEvent>, Sender<WatchError>) -> Result<B, WatchError>,
    {
        let (raw_tx, raw_rx) = bounded(self.raw_capacity);
        let (out_tx, out_rx) = bounded(self.output_capacity);
        let (err_tx, err_rx) = bounded(self.error_capacity);

        let backend = make_backend(raw_tx, err_tx)?;

        let registry = self.registry.unwrap_or_default();
        let walker = self
            .walker
            .unwrap_or_else(|| Box::new(WalkdirWalker::new(self.follow_symlinks)));

        let dispatcher = Dispatcher::new(registry.clone()).spawn(raw_rx, out_tx)?;

        crate::debug_event!(
            "watcher",
            "started",
            "raw capacity {}, output capacity {}",
            self.raw_capacity,
            self.output_capacity
        );

        Ok(FsWatcher {
            registry,
            backend: Mutex::new(Some(backend)),
            walker,
            events: out_rx,
            errors: err_rx,
            dispatcher,
        })
    }
}

impl Default for FsWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
