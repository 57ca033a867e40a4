// src/engine/mod.rs

pub mod driver;
pub mod invalidate;
pub mod reporter;
pub mod state;

pub use driver::{build, build_next_project, clean, report_summary};
pub use invalidate::{
    get_next_invalidated_project, ActionKind, InvalidatedProject, PendingQueue,
};
pub use reporter::{status_message, Reporter};
pub use state::{BuildOptions, BuildState, ProjectWatchSet};
