//! Watch command - print forwarded events until the stream closes.

use std::io::Write;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};

use crate::config::Settings;
use crate::watcher::{EventFlags, FileEvent, FsWatcher};

/// Options for the watch command.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub paths: Vec<PathBuf>,
    pub recursive: bool,
    pub flags: Option<EventFlags>,
    pub max_events: Option<usize>,
}

/// Run watch command.
///
/// Starts printing one line per forwarded event, then registers every
/// path. Returns the number of events printed.
pub fn run(options: WatchOptions, config: &Settings) -> Result<usize> {
    let flags = options.flags.unwrap_or(config.watcher.default_flags);

    let watcher = FsWatcher::builder()
        .config(&config.watcher)
        .build()
        .context("Failed to start watcher")?;

    let errors = watcher.errors().clone();
    thread::spawn(move || {
        for err in errors {
            tracing::warn!("[watch] {err}");
        }
    });

    // Registration blocks while nobody reads, so the printer starts first
    let (limit_tx, limit_rx) = bounded::<()>(0);
    let printer = {
        let events = watcher.events().clone();
        let max_events = options.max_events;
        thread::Builder::new()
            .name("pathwatch-print".to_string())
            .spawn(move || print_events(events, max_events, limit_tx))
            .context("Failed to start event printer")?
    };

    let registered = register(&watcher, &options, flags);
    if registered.is_ok() {
        crate::log_event!(
            "watch",
            "monitoring",
            "{} paths [{flags}]",
            watcher.registry().len()
        );
        // Disconnects once the limit is reached or the stream ends
        let _ = limit_rx.recv();
    }

    watcher.close();
    let printed = printer
        .join()
        .map_err(|_| anyhow!("Event printer panicked"))?;
    let stats = watcher.join()?;
    crate::debug_event!("watch", "done", "{stats:?}");

    registered?;
    printed
}

fn register(watcher: &FsWatcher, options: &WatchOptions, flags: EventFlags) -> Result<()> {
    for path in &options.paths {
        let result = if options.recursive {
            watcher.watch_all_flags(path, flags)
        } else {
            watcher.watch_flags(path, flags)
        };
        result.with_context(|| format!("Cannot watch {}", path.display()))?;
    }
    Ok(())
}

/// Print events until `max_events` or a write failure, then keep draining
/// silently until the stream closes. `limit` is dropped when printing stops.
fn print_events(
    events: Receiver<FileEvent>,
    max_events: Option<usize>,
    limit: Sender<()>,
) -> Result<usize> {
    let stdout = std::io::stdout();
    let mut limit = Some(limit);
    let mut printed = 0usize;
    let mut failure = None;

    for event in events {
        if limit.is_none() {
            continue;
        }

        let mut out = stdout.lock();
        if let Err(e) = writeln!(out, "{event}").and_then(|()| out.flush()) {
            failure = Some(e);
            limit = None;
            continue;
        }

        printed += 1;
        if max_events.is_some_and(|max| printed >= max) {
            limit = None;
        }
    }

    match failure {
        Some(e) => Err(e).context("Failed to write event"),
        None => Ok(printed),
    }
}
