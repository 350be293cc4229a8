//! End-to-end checks against the native watcher on a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pathwatch::{EventFlags, FileEvent, FsWatcher};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

fn temp_root() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    // Native watchers report canonical paths (e.g. /private/var on macOS)
    let root = temp.path().canonicalize().unwrap();
    (temp, root)
}

/// Wait for the first forwarded event on `path` matching `pred`.
fn wait_for(
    watcher: &FsWatcher,
    path: &Path,
    pred: impl Fn(&FileEvent) -> bool,
) -> Option<FileEvent> {
    let deadline = Instant::now() + TIMEOUT;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match watcher.events().recv_timeout(left) {
            Ok(event) if event.path() == path && pred(&event) => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

#[test]
fn test_native_modify_is_forwarded() {
    let (_temp, root) = temp_root();
    let file = root.join("watched.txt");
    fs::write(&file, "one").unwrap();

    let watcher = FsWatcher::builder().output_capacity(64).build().unwrap();
    watcher.watch_flags(&file, EventFlags::MODIFY).unwrap();

    fs::write(&file, "two").unwrap();

    let event = wait_for(&watcher, &file, FileEvent::is_modify).expect("modify event");
    assert!(event.to_string().contains("MODIFY"));
}

#[test]
fn test_native_create_and_delete_in_subtree() {
    let (_temp, root) = temp_root();

    let watcher = FsWatcher::builder().output_capacity(64).build().unwrap();
    watcher
        .watch_all_flags(&root, EventFlags::CREATE | EventFlags::DELETE)
        .unwrap();

    let file = root.join("new.txt");
    fs::write(&file, "hello").unwrap();
    assert!(wait_for(&watcher, &file, FileEvent::is_create).is_some());
    assert!(watcher.is_watched(&file));

    fs::remove_file(&file).unwrap();
    assert!(wait_for(&watcher, &file, FileEvent::is_delete).is_some());
}

#[test]
fn test_native_missing_path_is_an_error() {
    let (_temp, root) = temp_root();
    let missing = root.join("missing");

    let watcher = FsWatcher::new().unwrap();
    assert!(watcher.watch(&missing).is_err());
    assert!(watcher.watch_all(&missing).is_err());
}

#[test]
fn test_native_close_ends_stream() {
    let (_temp, root) = temp_root();

    let watcher = FsWatcher::new().unwrap();
    watcher.watch(&root).unwrap();
    watcher.remove_watch(&root).unwrap();
    assert!(!watcher.is_watched(&root));

    watcher.close();
    let stats = watcher.join().unwrap();
    assert_eq!(stats.forwarded, 0);
}
