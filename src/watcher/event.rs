//! Classified change events.
//!
//! The watch layer turns each native `notify` event into one [`FileEvent`]
//! per affected path. The dispatch loop only ever asks an event which
//! categories it belongs to.

use std::fmt;
use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::{AccessKind, AccessMode, ModifyKind};

use super::EventFlags;

/// A change notification for a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    path: PathBuf,
    kinds: EventFlags,
}

impl FileEvent {
    /// Create an event for `path` belonging to the `kinds` categories.
    pub fn new(path: impl Into<PathBuf>, kinds: EventFlags) -> Self {
        Self {
            path: path.into(),
            kinds,
        }
    }

    /// Split a native event into per-path events.
    ///
    /// Returns nothing for native kinds that map to no category (plain
    /// access, `Any`, `Other`).
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let kinds = classify(&event.kind);
        if kinds.is_empty() {
            return Vec::new();
        }

        event
            .paths
            .into_iter()
            .map(|path| Self::new(path, kinds))
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All categories this event belongs to.
    pub fn kinds(&self) -> EventFlags {
        self.kinds
    }

    pub fn is_create(&self) -> bool {
        self.kinds.contains(EventFlags::CREATE)
    }

    pub fn is_modify(&self) -> bool {
        self.kinds.contains(EventFlags::MODIFY)
    }

    pub fn is_delete(&self) -> bool {
        self.kinds.contains(EventFlags::DELETE)
    }

    pub fn is_rename(&self) -> bool {
        self.kinds.contains(EventFlags::RENAME)
    }

    pub fn is_file_write(&self) -> bool {
        self.kinds.contains(EventFlags::FILE_WRITE)
    }
}

/// Renders as `"path": CREATE|DELETE|MODIFY|FILE_WRITE|RENAME`, listing
/// only the categories the event belongs to. Bytes that are not valid
/// UTF-8 are escaped as `\xNN`.
impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.path, self.kinds)
    }
}

/// Map a native event kind onto subscription categories.
pub fn classify(kind: &EventKind) -> EventFlags {
    match kind {
        EventKind::Create(_) => EventFlags::CREATE,
        EventKind::Remove(_) => EventFlags::DELETE,
        EventKind::Modify(ModifyKind::Name(_)) => EventFlags::RENAME,
        EventKind::Modify(ModifyKind::Data(_)) => EventFlags::MODIFY | EventFlags::FILE_WRITE,
        EventKind::Modify(_) => EventFlags::MODIFY,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => EventFlags::FILE_WRITE,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => EventFlags::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};

    #[test]
    fn test_display_modify_and_write() {
        let event = FileEvent::new("/tmp/x", EventFlags::MODIFY | EventFlags::FILE_WRITE);
        assert_eq!(event.to_string(), "\"/tmp/x\": MODIFY|FILE_WRITE");
    }

    #[test]
    fn test_display_without_categories() {
        let event = FileEvent::new("/tmp/x", EventFlags::empty());
        assert_eq!(event.to_string(), "\"/tmp/x\": ");
    }

    #[cfg(unix)]
    #[test]
    fn test_display_escapes_non_utf8_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/bad\xffname"));
        let rendered = FileEvent::new(path, EventFlags::CREATE).to_string();

        assert!(!rendered.contains('\u{FFFD}'), "{rendered}");
        assert!(rendered.to_lowercase().contains("\\xff"), "{rendered}");
        assert!(rendered.ends_with(": CREATE"));
    }

    #[test]
    fn test_display_escapes_path() {
        let event = FileEvent::new("/tmp/a \"b\"", EventFlags::DELETE);
        assert_eq!(event.to_string(), r#""/tmp/a \"b\"": DELETE"#);
    }

    #[test]
    fn test_predicates_follow_kinds() {
        let event = FileEvent::new("/tmp/x", EventFlags::CREATE | EventFlags::RENAME);
        assert!(event.is_create());
        assert!(event.is_rename());
        assert!(!event.is_modify());
        assert!(!event.is_delete());
        assert!(!event.is_file_write());
    }

    #[test]
    fn test_classify_native_kinds() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            EventFlags::CREATE
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::Folder)),
            EventFlags::DELETE
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            EventFlags::RENAME
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            EventFlags::MODIFY | EventFlags::FILE_WRITE
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Permissions
            ))),
            EventFlags::MODIFY
        );
        assert_eq!(
            classify(&EventKind::Access(AccessKind::Close(AccessMode::Write))),
            EventFlags::FILE_WRITE
        );
        assert!(classify(&EventKind::Access(AccessKind::Open(AccessMode::Read))).is_empty());
        assert!(classify(&EventKind::Any).is_empty());
    }

    #[test]
    fn test_from_notify_splits_paths() {
        let native = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/tmp/old"))
            .add_path(PathBuf::from("/tmp/new"));

        let events = FileEvent::from_notify(native);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].path(), Path::new("/tmp/old"));
        assert_eq!(events[1].path(), Path::new("/tmp/new"));
        assert!(events.iter().all(FileEvent::is_rename));
    }

    #[test]
    fn test_from_notify_drops_uncategorized() {
        let native = notify::Event::new(EventKind::Access(AccessKind::Read))
            .add_path(PathBuf::from("/tmp/x"));
        assert!(FileEvent::from_notify(native).is_empty());
    }
}
