// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::watch::orchestrator::WatchMessage;

/// Handle for the filesystem watcher.
///
/// Exists mainly so the underlying `RecommendedWatcher` stays alive for as
/// long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Observe the given project directories recursively, forwarding every
/// changed path into the orchestrator's channel. Classification happens on
/// the engine side; this shell only bridges notify into the async world.
pub fn spawn_watcher(
    roots: Vec<PathBuf>,
    tx: mpsc::UnboundedSender<WatchMessage>,
) -> Result<WatcherHandle> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in event.paths {
                    if tx.send(WatchMessage::PathChanged(path)).is_err() {
                        // Orchestrator is gone; nothing left to notify.
                        return;
                    }
                }
            }
            Err(err) => {
                eprintln!("tsbuild: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for root in &roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
        debug!(root = %root.display(), "watching directory");
    }
    info!(roots = roots.len(), "file watcher started");

    Ok(WatcherHandle { _inner: watcher })
}
