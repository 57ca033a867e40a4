// src/watch/orchestrator.rs

//! The watch-mode event loop.
//!
//! Raw paths from the watcher shell are classified into per-project events,
//! projects are invalidated at the appropriate reload level, and a ~250 ms
//! debounce timer coalesces bursts of events into one drain pass. Each timer
//! firing drains exactly one invalidated project; if more remain the timer
//! is rescheduled, and once the queue runs dry the summary is emitted.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::engine::{self, BuildState};
use crate::errors::Result;
use crate::types::CancellationToken;
use crate::watch::events::{classify_raw_event, handle_watch_event};

/// Delay between the last file-system event and the drain pass it triggers.
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// Messages entering the watch loop from the shell.
#[derive(Debug, Clone)]
pub enum WatchMessage {
    PathChanged(PathBuf),
    Shutdown,
}

/// Run the watch loop until shutdown. The initial one-shot build must have
/// completed and `start_watching` must have installed the watch sets.
pub async fn run_watch(
    state: &mut BuildState,
    mut rx: mpsc::UnboundedReceiver<WatchMessage>,
    cancel: Option<&CancellationToken>,
) -> Result<()> {
    state.host.enable_cache();

    tokio::pin! {
        let timer = sleep(DEBOUNCE);
    }
    let mut timer_armed = false;

    loop {
        tokio::select! {
            _ = &mut timer, if timer_armed => {
                timer_armed = false;
                let drained = engine::build_next_project(state, cancel)?;
                // Stop once the queue is drained, and also when the factory
                // finds nothing actionable (a pending key can outlive its
                // project after a config edit removed it from the graph).
                if drained.is_some() && !state.pending.is_empty() {
                    timer.as_mut().reset(Instant::now() + DEBOUNCE);
                    timer_armed = true;
                } else {
                    let order = state.get_build_order();
                    engine::report_summary(state, &order);
                }
            }
            message = rx.recv() => {
                match message {
                    Some(WatchMessage::PathChanged(path)) => {
                        state.host.invalidate(&path);
                        let was_idle = !timer_armed && state.pending.is_empty();
                        let mut scheduled = false;
                        for event in classify_raw_event(state, &path) {
                            scheduled |= handle_watch_event(state, event);
                        }
                        if scheduled {
                            if was_idle {
                                state.reporter.clear_screen(state.options.preserve_watch_output);
                                state.reporter.report_watch_status(
                                    "File change detected. Starting incremental compilation...",
                                );
                            }
                            debug!(path = %path.display(), "scheduling invalidated projects");
                            timer.as_mut().reset(Instant::now() + DEBOUNCE);
                            timer_armed = true;
                        }
                    }
                    Some(WatchMessage::Shutdown) | None => {
                        debug!("watch loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    state.host.disable_cache();
    Ok(())
}
