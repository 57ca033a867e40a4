// src/engine/invalidate.rs

//! The pending-build queue and the invalidated-project factory.
//!
//! The queue is a set-with-level: each key maps to the highest reload level
//! ever requested for it, and re-enqueueing only ever raises the level.
//!
//! [`get_next_invalidated_project`] walks the (sub-)build order and converts
//! the first actionable pending project into one of three action handles:
//! a full [`ActionKind::Build`], a bundle-only [`ActionKind::UpdateBundle`],
//! or a timestamp-only [`ActionKind::UpdateOutputFileStamps`]. Projects that
//! turn out to need nothing (up to date, containers, blocked by upstream
//! errors) are skipped and their pending entries cleared in place.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ParsedProjectConfig;
use crate::engine::state::BuildState;
use crate::status::{up_to_date_status, UpToDateStatus};
use crate::graph::BuildOrder;
use crate::types::{Diagnostic, ProjectKey, ReloadLevel, ResolvedPath};

const UNBUILDABLE_PROJECT: u32 = 6353;

/// Set-with-level of projects awaiting (re)build.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: HashMap<ProjectKey, ReloadLevel>,
}

impl PendingQueue {
    /// Request a (re)build. The stored level is the monotone maximum of all
    /// requests; a `None` arriving after a `Full` is ignored.
    pub fn enqueue(&mut self, key: ProjectKey, level: ReloadLevel) {
        let entry = self.entries.entry(key).or_insert(level);
        if level > *entry {
            *entry = level;
        }
    }

    pub fn get(&self, key: &ProjectKey) -> Option<ReloadLevel> {
        self.entries.get(key).copied()
    }

    pub fn clear(&mut self, key: &ProjectKey) {
        self.entries.remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// What kind of work a project needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Run the full compiler pipeline.
    Build,
    /// Regenerate only non-declaration outputs from persisted build-info.
    UpdateBundle,
    /// Touch existing output files only.
    UpdateOutputFileStamps,
}

/// A one-shot handle for the work one project needs. Consumed by
/// [`crate::engine::driver`]'s `done`.
#[derive(Debug)]
pub struct InvalidatedProject {
    pub kind: ActionKind,
    pub project: ResolvedPath,
    pub key: ProjectKey,
    pub config: Arc<ParsedProjectConfig>,
    pub status: UpToDateStatus,
}

/// Walk the build order and return the first pending project that actually
/// needs an action, applying reload levels and clearing the pending entries
/// of projects that need nothing.
pub fn get_next_invalidated_project(
    state: &mut BuildState,
    order: &BuildOrder,
) -> Option<InvalidatedProject> {
    let host = state.host.clone();

    for project in &order.order {
        let key = state.key_for(project);
        let Some(level) = state.pending.get(&key) else {
            continue;
        };

        // Apply the requested reload before looking at anything else.
        match level {
            ReloadLevel::Full => {
                state.config_cache.evict(&key);
            }
            ReloadLevel::Partial => {
                state.config_cache.reload_inputs(host.as_ref(), project);
            }
            ReloadLevel::None => {}
        }

        let config = match state.config_cache.parse(host.as_ref(), project) {
            Ok(config) => config,
            Err(diagnostic) => {
                // Unparseable config: the project is unbuildable and is
                // skipped; downstream projects will see UpstreamBlocked.
                state.project_status.insert(
                    key.clone(),
                    UpToDateStatus::Unbuildable {
                        reason: diagnostic.message.clone(),
                    },
                );
                state
                    .reporter
                    .record_diagnostics(key.clone(), vec![diagnostic]);
                state.reporter.report_errors(&key);
                state.pending.clear(&key);
                continue;
            }
        };

        if state.watching && level != ReloadLevel::None {
            crate::watch::events::rewire_project_watchers(state, &key, &config, level);
        }

        let status = up_to_date_status(state, &config, &key);

        // A config that parsed with errors never counts as up to date; the
        // build surfaces its diagnostics.
        let config_has_errors = config.errors.iter().any(|d| d.is_error());

        if !state.options.force && !config_has_errors {
            match &status {
                UpToDateStatus::UpToDate(_) => {
                    state.reporter.report_status(
                        state.options.verbose,
                        project,
                        &status,
                    );
                    state.reporter.report_errors(&key);
                    if state.options.dry {
                        info!("Project '{}' is up to date", project.display());
                    }
                    state.pending.clear(&key);
                    continue;
                }
                UpToDateStatus::UpToDateWithUpstreamTypes(_) => {
                    state
                        .reporter
                        .report_status(state.options.verbose, project, &status);
                    return Some(InvalidatedProject {
                        kind: ActionKind::UpdateOutputFileStamps,
                        project: project.clone(),
                        key,
                        config,
                        status,
                    });
                }
                _ => {}
            }
        }

        match &status {
            UpToDateStatus::UpstreamBlocked { upstream_project } => {
                if state.options.verbose {
                    info!(
                        "Skipping project '{}' because its dependency '{}' has errors",
                        project.display(),
                        upstream_project.display()
                    );
                }
                state.pending.clear(&key);
                continue;
            }
            UpToDateStatus::ContainerOnly => {
                state.pending.clear(&key);
                continue;
            }
            UpToDateStatus::Unbuildable { reason } => {
                // Missing input files; same treatment as a config error.
                state.reporter.record_diagnostics(
                    key.clone(),
                    vec![Diagnostic::error_in(
                        project.clone(),
                        UNBUILDABLE_PROJECT,
                        reason.clone(),
                    )],
                );
                state.reporter.report_errors(&key);
                state.pending.clear(&key);
                continue;
            }
            _ => {}
        }

        state
            .reporter
            .report_status(state.options.verbose, project, &status);

        let kind = if needs_build(state, &status, &config) {
            ActionKind::Build
        } else {
            ActionKind::UpdateBundle
        };
        debug!(project = %project.display(), ?kind, "selected invalidated project");
        return Some(InvalidatedProject {
            kind,
            project: project.clone(),
            key,
            config,
            status,
        });
    }

    None
}

/// Whether a project needs the full pipeline rather than a bundle update.
/// Only `OutOfDateWithPrepend` on an error-free incremental configuration
/// qualifies for the cheaper path.
fn needs_build(
    state: &BuildState,
    status: &UpToDateStatus,
    config: &ParsedProjectConfig,
) -> bool {
    if state.options.force {
        return true;
    }
    if !matches!(status, UpToDateStatus::OutOfDateWithPrepend { .. }) {
        return true;
    }
    if config.file_names.is_empty() {
        return true;
    }
    if config.errors.iter().any(|d| d.is_error()) {
        return true;
    }
    !(config.options.incremental || state.options.incremental)
}
