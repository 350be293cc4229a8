pub mod cli;
pub mod config;
pub mod logging;
pub mod watcher;

pub use config::Settings;
pub use watcher::{
    DispatchStats, EventFlags, FileEvent, FsWatcher, FsWatcherBuilder, InterestRegistry,
    WatchBackend, WatchError,
};
