// src/watch/events.rs

//! Pure watch-event handling: classification of raw file-system paths into
//! per-project events, output-file filtering, and project invalidation.
//!
//! Everything here is synchronous and deterministic so the whole
//! invalidation pipeline can be unit tested without the async shell.

use std::collections::HashSet;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{has_source_extension, is_declaration_file, ParsedProjectConfig};
use crate::engine::state::{BuildState, ProjectWatchSet};
use crate::types::{ProjectKey, ReloadLevel};

/// What a raw path event means for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEventKind {
    /// The project's config file (or something in its `extends` chain)
    /// changed.
    ConfigFile,
    /// Something changed under a wildcard (`include`) directory.
    WildcardDirectory(PathBuf),
    /// A known input file changed.
    InputFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectWatchEvent {
    pub key: ProjectKey,
    pub kind: WatchEventKind,
}

/// Install the engine-level watch sets for every project in the current
/// build order. Returns the project directories the shell should observe.
/// One-shot builds never call this; watch mode calls it once, after the
/// initial build.
pub fn start_watching(state: &mut BuildState) -> Vec<PathBuf> {
    let order = state.get_build_order();
    let mut roots = Vec::new();
    for project in &order.order {
        let key = state.key_for(project);
        if let Ok(config) = state.parse_config(project) {
            if !roots.contains(&config.project_dir) {
                roots.push(config.project_dir.clone());
            }
            install_watch_set(state, &key, &config);
        } else {
            // Still watch the config file so a fix re-triggers the build.
            state.watch_sets.insert(
                key,
                ProjectWatchSet {
                    config_paths: vec![project.clone()],
                    ..ProjectWatchSet::default()
                },
            );
            if let Some(dir) = project.parent() {
                if !roots.contains(&dir.to_path_buf()) {
                    roots.push(dir.to_path_buf());
                }
            }
        }
    }
    state.watching = true;
    debug!(projects = state.watch_sets.len(), "watchers installed");
    roots
}

fn install_watch_set(state: &mut BuildState, key: &ProjectKey, config: &ParsedProjectConfig) {
    state.watch_sets.insert(
        key.clone(),
        ProjectWatchSet {
            config_paths: config.extended_config_paths.clone(),
            input_files: config.file_names.iter().cloned().collect(),
            wildcard_directories: config.wildcard_directories.clone(),
        },
    );
}

/// Rebuild a project's watch set after a reload: `Full` replaces the whole
/// set, `Partial` only the expanded input files.
pub fn rewire_project_watchers(
    state: &mut BuildState,
    key: &ProjectKey,
    config: &ParsedProjectConfig,
    level: ReloadLevel,
) {
    match level {
        ReloadLevel::Full => install_watch_set(state, key, config),
        ReloadLevel::Partial => {
            let input_files: HashSet<PathBuf> = config.file_names.iter().cloned().collect();
            if let Some(set) = state.watch_sets.get_mut(key) {
                set.input_files = input_files;
            } else {
                install_watch_set(state, key, config);
            }
        }
        ReloadLevel::None => {}
    }
}

/// Map a raw changed path onto the projects that care about it.
pub fn classify_raw_event(state: &BuildState, path: &Path) -> Vec<ProjectWatchEvent> {
    let mut events = Vec::new();
    for (key, set) in &state.watch_sets {
        if set.config_paths.iter().any(|c| c == path) {
            events.push(ProjectWatchEvent {
                key: key.clone(),
                kind: WatchEventKind::ConfigFile,
            });
            continue;
        }
        if set.input_files.contains(path) {
            events.push(ProjectWatchEvent {
                key: key.clone(),
                kind: WatchEventKind::InputFile(path.to_path_buf()),
            });
            continue;
        }
        let in_wildcard = set.wildcard_directories.iter().any(|dir| {
            if dir.recursive {
                path.starts_with(&dir.path)
            } else {
                path.parent() == Some(dir.path.as_path())
            }
        });
        if in_wildcard {
            events.push(ProjectWatchEvent {
                key: key.clone(),
                kind: WatchEventKind::WildcardDirectory(path.to_path_buf()),
            });
        }
    }
    events
}

/// Apply one classified event: decide the reload level (or ignore the
/// event) and invalidate the project. Returns whether anything was
/// scheduled.
pub fn handle_watch_event(state: &mut BuildState, event: ProjectWatchEvent) -> bool {
    match event.kind {
        WatchEventKind::ConfigFile => {
            invalidate_project(state, &event.key, ReloadLevel::Full);
            true
        }
        WatchEventKind::InputFile(path) => {
            debug!(project = %event.key, file = %path.display(), "input file changed");
            invalidate_project(state, &event.key, ReloadLevel::None);
            true
        }
        WatchEventKind::WildcardDirectory(path) => {
            if !has_source_extension(&path) {
                return false;
            }
            let config = match state.config_cache.get(&event.key) {
                Some(Ok(config)) => config.clone(),
                _ => {
                    invalidate_project(state, &event.key, ReloadLevel::Partial);
                    return true;
                }
            };
            if is_output_file(&config, &path) {
                return false;
            }
            invalidate_project(state, &event.key, ReloadLevel::Partial);
            true
        }
    }
}

/// Output classification for wildcard-directory events: paths the project
/// itself wrote must not re-trigger it.
pub fn is_output_file(config: &ParsedProjectConfig, path: &Path) -> bool {
    if !config.enables_emit() {
        return false;
    }
    // Source files are outputs only when they are declarations.
    if has_source_extension(path) && !is_declaration_file(path) {
        return false;
    }
    if let Some(out_file) = &config.options.out_file {
        if path == out_file {
            return true;
        }
        let mut decl = out_file.clone();
        decl.set_extension("d.ts");
        if path == decl {
            return true;
        }
    }
    if let Some(dir) = &config.options.declaration_dir {
        if path.starts_with(dir) {
            return true;
        }
    }
    if let Some(dir) = &config.options.out_dir {
        if path.starts_with(dir) {
            return true;
        }
    }
    !config.file_names.iter().any(|f| f == path)
}

/// Clear cached state for a project and raise its queue entry. `Full`
/// invalidations also discard the memoized build order.
pub fn invalidate_project(state: &mut BuildState, key: &ProjectKey, level: ReloadLevel) {
    debug!(project = %key, ?level, "invalidating project");
    state.project_status.remove(key);
    if level == ReloadLevel::Full {
        state.build_order = None;
    }
    state.needs_summary = true;
    state.pending.enqueue(key.clone(), level);
}
