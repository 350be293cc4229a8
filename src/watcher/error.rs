//! Error types for the subscription watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Cannot stop watching path {path}: {reason}")]
    PathUnwatchFailed { path: PathBuf, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    #[error("Unknown event category '{token}'")]
    InvalidFlags { token: String },

    #[error("Watcher is closed")]
    Closed,

    #[error("Dispatch loop terminated unexpectedly")]
    DispatchFailed,
}

impl WatchError {
    /// Wrap a native watch failure for `path`.
    pub fn watch_failed(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        WatchError::PathWatchFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Wrap a native unwatch failure for `path`.
    pub fn unwatch_failed(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        WatchError::PathUnwatchFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
