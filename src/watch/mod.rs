// src/watch/mod.rs

pub mod events;
pub mod orchestrator;
pub mod watcher;

pub use events::{
    classify_raw_event, handle_watch_event, invalidate_project, is_output_file,
    rewire_project_watchers, start_watching, ProjectWatchEvent, WatchEventKind,
};
pub use orchestrator::{run_watch, WatchMessage, DEBOUNCE};
pub use watcher::{spawn_watcher, WatcherHandle};
