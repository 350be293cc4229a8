//! Per-path filesystem change subscriptions.
//!
//! Callers register interest in categories of change (create, modify,
//! delete, rename, write) per path or per subtree, and read back only the
//! events matching what they asked for from a single stream.
//!
//! # Architecture
//!
//! ```text
//! NotifyBackend (native watcher callback)
//!        |  classified FileEvents, bounded, blocking send
//!        v
//!   Dispatcher thread --- reads ---> InterestRegistry <--- writes --- FsWatcher::watch*
//!        |  matching events, bounded, blocking send
//!        v
//!   FsWatcher::events()
//! ```

mod backend;
mod dispatch;
mod error;
mod event;
mod flags;
mod fs_watcher;
mod registry;

pub use backend::{NotifyBackend, TreeWalker, WalkdirWalker, WatchBackend};
pub use dispatch::{DispatchStats, Dispatcher, should_forward};
pub use error::WatchError;
pub use event::{FileEvent, classify};
pub use flags::EventFlags;
pub use fs_watcher::{FsWatcher, FsWatcherBuilder};
pub use registry::InterestRegistry;
