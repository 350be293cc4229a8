//! Per-path interest registry.
//!
//! Maps each watched path to the categories its subscriber asked for.
//! Shared between the registration calls and the dispatch loop, so every
//! operation takes the lock exactly once and releases it before returning.
//!
//! A path that is absent and a path registered with an empty mask are
//! equivalent for filtering: both forward nothing.
//!
//! Paths registered through a subtree walk are additionally marked as
//! subtree members. A path created directly inside such a directory picks
//! up the directory's mask the first time it is seen, so files appearing
//! after a recursive registration are filtered like their siblings. The
//! inherited entry is not itself a subtree member: nothing observes its
//! own children until it is registered explicitly.
//!
//! A path removed from inside a subtree (by the caller or because it was
//! deleted) is detached and never inherits again until a registration call
//! names it or its directory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::EventFlags;

#[derive(Debug, Default)]
struct Entries {
    masks: HashMap<PathBuf, EventFlags>,
    subtree: HashSet<PathBuf>,
    detached: HashSet<PathBuf>,
}

impl Entries {
    fn in_subtree(&self, path: &Path) -> bool {
        path.parent().is_some_and(|parent| self.subtree.contains(parent))
    }
}

/// Registry of subscribed paths and their category masks.
#[derive(Debug, Default)]
pub struct InterestRegistry {
    entries: Mutex<Entries>,
}

impl InterestRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the mask for `path`.
    ///
    /// Any mask is accepted, including the empty one, which keeps the path
    /// known while suppressing all of its events.
    pub fn set(&self, path: impl Into<PathBuf>, mask: EventFlags) {
        let path = path.into();
        let mut entries = self.entries.lock();
        entries.detached.remove(&path);
        entries.masks.insert(path, mask);
    }

    /// Like [`set`](Self::set), and mark `path` as part of a recursively
    /// watched subtree. Children detached from `path` may inherit again.
    pub fn set_subtree(&self, path: impl Into<PathBuf>, mask: EventFlags) {
        let path = path.into();
        let mut entries = self.entries.lock();
        entries.detached.remove(&path);
        entries
            .detached
            .retain(|detached| detached.parent() != Some(path.as_path()));
        entries.subtree.insert(path.clone());
        entries.masks.insert(path, mask);
    }

    /// Mask for `path`, or the empty mask if the path is not registered.
    pub fn get(&self, path: &Path) -> EventFlags {
        self.entries
            .lock()
            .masks
            .get(path)
            .copied()
            .unwrap_or_default()
    }

    /// Mask to filter an event on `path` with.
    ///
    /// Same as [`get`](Self::get), except that a creation of a path never
    /// seen before, whose parent is a subtree member, registers the path
    /// with the parent's mask first.
    pub fn resolve(&self, path: &Path, is_create: bool) -> EventFlags {
        let mut entries = self.entries.lock();
        if let Some(mask) = entries.masks.get(path) {
            return *mask;
        }
        if !is_create || entries.detached.contains(path) {
            return EventFlags::empty();
        }

        let inherited = path
            .parent()
            .filter(|parent| entries.subtree.contains(*parent))
            .and_then(|parent| entries.masks.get(parent).copied());

        match inherited {
            Some(mask) => {
                entries.masks.insert(path.to_path_buf(), mask);
                mask
            }
            None => EventFlags::empty(),
        }
    }

    /// Remove `path`. Returns whether a mask entry existed.
    ///
    /// Inside a subtree the path is detached, so a later creation of the
    /// same path stays unsubscribed.
    pub fn remove(&self, path: &Path) -> bool {
        let mut entries = self.entries.lock();
        entries.subtree.remove(path);
        if entries.in_subtree(path) {
            entries.detached.insert(path.to_path_buf());
        }
        entries.masks.remove(path).is_some()
    }

    /// Check if `path` has an entry (even an empty one).
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.lock().masks.contains_key(path)
    }

    /// Check if `path` was registered as part of a subtree.
    pub fn is_subtree_member(&self, path: &Path) -> bool {
        self.entries.lock().subtree.contains(path)
    }

    /// Check if `path` was removed from a subtree and may not inherit.
    pub fn is_detached(&self, path: &Path) -> bool {
        self.entries.lock().detached.contains(path)
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.entries.lock().masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().masks.is_empty()
    }

    /// Snapshot of all registered paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.lock().masks.keys().cloned().collect();
        paths.sort();
        paths
    }
}
