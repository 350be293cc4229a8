//! Filter-and-dispatch loop.
//!
//! Single consumer of the raw event channel. Each event is checked against
//! the subscriber's mask and, if any requested category matches, forwarded
//! on the public stream. Deletions always clear the path's registry entry.
//!
//! Forwarding is a blocking send on a bounded channel: a consumer that stops
//! reading stalls this loop, which fills the raw channel, which in turn
//! blocks the native watcher callback. The registry lock is never held
//! across that send.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::{EventFlags, FileEvent, InterestRegistry, WatchError};

/// Counters collected over the lifetime of one dispatch loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events read from the raw channel.
    pub received: usize,
    /// Events delivered on the public stream.
    pub forwarded: usize,
    /// Events that matched no requested category.
    pub suppressed: usize,
    /// Events that matched but had no reader left to take them.
    pub discarded: usize,
    /// Registry entries removed because their path was deleted.
    pub cleaned_up: usize,
}

/// Whether an event passes a subscription mask.
///
/// Categories are OR-combined: one requested category present on the
/// event is enough.
pub fn should_forward(mask: EventFlags, event: &FileEvent) -> bool {
    (mask.contains(EventFlags::CREATE) && event.is_create())
        || (mask.contains(EventFlags::MODIFY) && event.is_modify())
        || (mask.contains(EventFlags::DELETE) && event.is_delete())
        || (mask.contains(EventFlags::RENAME) && event.is_rename())
        || (mask.contains(EventFlags::FILE_WRITE) && event.is_file_write())
}

/// Runs the filter loop against a shared registry.
pub struct Dispatcher {
    registry: Arc<InterestRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<InterestRegistry>) -> Self {
        Self { registry }
    }

    /// Start the loop on a dedicated thread.
    pub fn spawn(
        self,
        receiver: Receiver<FileEvent>,
        sender: Sender<FileEvent>,
    ) -> Result<JoinHandle<DispatchStats>, WatchError> {
        thread::Builder::new()
            .name("pathwatch-dispatch".to_string())
            .spawn(move || self.run(receiver, sender))
            .map_err(|e| WatchError::InitFailed {
                reason: format!("cannot spawn dispatch thread: {e}"),
            })
    }

    /// Consume `receiver` until every sender is gone, forwarding matching
    /// events to `sender`. The public stream closes when this returns.
    pub fn run(&self, receiver: Receiver<FileEvent>, sender: Sender<FileEvent>) -> DispatchStats {
        let mut stats = DispatchStats::default();
        let mut reader_gone = false;

        crate::debug_event!("dispatch", "started");

        for event in receiver {
            stats.received += 1;

            let mask = self.registry.resolve(event.path(), event.is_create());
            let deleted = event.is_delete().then(|| event.path().to_path_buf());

            if !should_forward(mask, &event) {
                crate::debug_event!("dispatch", "suppressed", "{event} (mask: {mask})");
                stats.suppressed += 1;
            } else if reader_gone {
                stats.discarded += 1;
            } else if let Err(err) = sender.send(event) {
                // Keep draining so deletions still clean up and the native
                // watcher is never blocked on a full raw channel.
                crate::debug_event!(
                    "dispatch",
                    "reader dropped",
                    "discarding {}",
                    err.into_inner()
                );
                reader_gone = true;
                stats.discarded += 1;
            } else {
                stats.forwarded += 1;
            }

            if let Some(path) = deleted {
                if self.registry.remove(&path) {
                    crate::debug_event!("dispatch", "unsubscribed", "{}", path.display());
                    stats.cleaned_up += 1;
                }
            }
        }

        crate::debug_event!(
            "dispatch",
            "stopped",
            "{} received, {} forwarded, {} suppressed",
            stats.received,
            stats.forwarded,
            stats.suppressed
        );

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::path::{Path, PathBuf};

    fn event(path: &str, kinds: EventFlags) -> FileEvent {
        FileEvent::new(path, kinds)
    }

    #[test]
    fn test_should_forward_any_matching_category() {
        let modify_write = event("/x", EventFlags::MODIFY | EventFlags::FILE_WRITE);

        assert!(should_forward(EventFlags::MODIFY, &modify_write));
        assert!(should_forward(EventFlags::FILE_WRITE, &modify_write));
        assert!(should_forward(EventFlags::ALL_FLAGS, &modify_write));
        assert!(!should_forward(EventFlags::CREATE, &modify_write));
        assert!(!should_forward(EventFlags::empty(), &modify_write));
    }

    #[test]
    fn test_should_forward_matches_mask_intersection() {
        // Exhaustive over every mask and every category set
        for mask_bits in 0..=EventFlags::ALL_FLAGS.bits() {
            for kind_bits in 0..=EventFlags::ALL_FLAGS.bits() {
                let mask = EventFlags::from_bits_truncate(mask_bits);
                let kinds = EventFlags::from_bits_truncate(kind_bits);
                assert_eq!(
                    should_forward(mask, &event("/x", kinds)),
                    mask.intersects(kinds),
                    "mask {mask}, kinds {kinds}"
                );
            }
        }
    }

    #[test]
    fn test_run_filters_and_closes_stream() {
        let registry = Arc::new(InterestRegistry::new());
        registry.set("/watched", EventFlags::MODIFY);

        let (raw_tx, raw_rx) = bounded(16);
        let (out_tx, out_rx) = bounded(16);

        raw_tx.send(event("/watched", EventFlags::CREATE)).unwrap();
        raw_tx
            .send(event("/watched", EventFlags::MODIFY | EventFlags::FILE_WRITE))
            .unwrap();
        raw_tx.send(event("/other", EventFlags::MODIFY)).unwrap();
        drop(raw_tx);

        let stats = Dispatcher::new(registry).run(raw_rx, out_tx);

        let forwarded: Vec<_> = out_rx.iter().collect();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].path(), Path::new("/watched"));
        assert!(forwarded[0].is_modify());

        assert_eq!(stats.received, 3);
        assert_eq!(stats.forwarded, 1);
        assert_eq!(stats.suppressed, 2);
    }

    #[test]
    fn test_run_deletion_cleans_registry_even_when_suppressed() {
        let registry = Arc::new(InterestRegistry::new());
        registry.set("/a", EventFlags::MODIFY);
        registry.set("/b", EventFlags::DELETE);

        let (raw_tx, raw_rx) = bounded(16);
        let (out_tx, out_rx) = bounded(16);

        raw_tx.send(event("/a", EventFlags::DELETE)).unwrap();
        raw_tx.send(event("/b", EventFlags::DELETE)).unwrap();
        raw_tx.send(event("/b", EventFlags::MODIFY)).unwrap();
        drop(raw_tx);

        let stats = Dispatcher::new(registry.clone()).run(raw_rx, out_tx);

        let forwarded: Vec<PathBuf> = out_rx.iter().map(|e| e.path().to_path_buf()).collect();
        assert_eq!(forwarded, vec![PathBuf::from("/b")]);
        assert!(registry.is_empty());
        assert_eq!(stats.cleaned_up, 2);
    }

    #[test]
    fn test_run_deleted_subtree_path_stays_unsubscribed_when_recreated() {
        let registry = Arc::new(InterestRegistry::new());
        registry.set_subtree("/dir", EventFlags::ALL_FLAGS);
        registry.set_subtree("/dir/a", EventFlags::ALL_FLAGS);

        let (raw_tx, raw_rx) = bounded(16);
        let (out_tx, out_rx) = bounded(16);

        raw_tx.send(event("/dir/a", EventFlags::DELETE)).unwrap();
        raw_tx.send(event("/dir/a", EventFlags::CREATE)).unwrap();
        raw_tx.send(event("/dir/a", EventFlags::MODIFY)).unwrap();
        drop(raw_tx);

        let stats = Dispatcher::new(registry.clone()).run(raw_rx, out_tx);

        let forwarded: Vec<_> = out_rx.iter().collect();
        assert_eq!(forwarded, vec![event("/dir/a", EventFlags::DELETE)]);
        assert_eq!(stats.suppressed, 2);
        assert!(!registry.contains(Path::new("/dir/a")));
    }

    #[test]
    fn test_run_keeps_draining_after_reader_dropped() {
        let registry = Arc::new(InterestRegistry::new());
        registry.set("/a", EventFlags::ALL_FLAGS);

        let (raw_tx, raw_rx) = bounded(16);
        let (out_tx, out_rx) = bounded(16);
        drop(out_rx);

        raw_tx.send(event("/a", EventFlags::MODIFY)).unwrap();
        raw_tx.send(event("/a", EventFlags::DELETE)).unwrap();
        drop(raw_tx);

        let stats = Dispatcher::new(registry.clone()).run(raw_rx, out_tx);

        assert_eq!(stats.received, 2);
        assert_eq!(stats.forwarded, 0);
        assert_eq!(stats.discarded, 2);
        assert!(!registry.contains(Path::new("/a")));
    }

    #[test]
    fn test_spawned_loop_blocks_on_rendezvous_stream() {
        let registry = Arc::new(InterestRegistry::new());
        registry.set("/a", EventFlags::ALL_FLAGS);

        let (raw_tx, raw_rx) = bounded(1);
        let (out_tx, out_rx) = bounded(0);

        let handle = Dispatcher::new(registry).spawn(raw_rx, out_tx).unwrap();

        for i in 0..5 {
            raw_tx
                .send(event(&format!("/a{i}"), EventFlags::MODIFY))
                .unwrap();
        }
        raw_tx.send(event("/a", EventFlags::MODIFY)).unwrap();
        drop(raw_tx);

        let forwarded: Vec<_> = out_rx.iter().collect();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].path(), Path::new("/a"));

        let stats = handle.join().unwrap();
        assert_eq!(stats.received, 6);
        assert_eq!(stats.suppressed, 5);
    }
}
