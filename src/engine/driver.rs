// src/engine/driver.rs

//! The build driver.
//!
//! Iterates the build order, executes the next invalidated project's action,
//! and propagates consequences downstream. Strictly sequential: projects are
//! built in topological order and a `done` call runs to completion before
//! anything else observes engine state.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::compile::EmitOutput;
use crate::config::{is_declaration_file, ParsedProjectConfig};
use crate::engine::invalidate::{
    get_next_invalidated_project, ActionKind, InvalidatedProject,
};
use crate::engine::state::BuildState;
use crate::errors::{Result, TsbuildError};
use crate::graph::BuildOrder;
use crate::host::{maximum_time, missing_file_time, BuildHost};
use crate::status::{Freshness, UpToDateStatus};
use crate::types::{
    BuildResultFlags, CancellationToken, Diagnostic, ExitStatus, ProjectKey, ReloadLevel,
    ResolvedPath,
};

impl InvalidatedProject {
    /// Perform this project's action (if not already run) and clear its
    /// pending-build entry.
    pub fn done(
        self,
        state: &mut BuildState,
        order: &BuildOrder,
        cancel: Option<&CancellationToken>,
    ) -> Result<BuildResultFlags> {
        let key = self.key.clone();
        let flags = match self.kind {
            ActionKind::Build => execute_build(state, &self, order, cancel)?,
            ActionKind::UpdateBundle => execute_update_bundle(state, &self, order, cancel)?,
            ActionKind::UpdateOutputFileStamps => execute_update_stamps(state, &self)?,
        };
        state.pending.clear(&key);
        Ok(flags)
    }
}

/// One-shot build of every project reachable from the roots (or of one
/// sub-project's closure).
pub fn build(
    state: &mut BuildState,
    project: Option<&ResolvedPath>,
    cancel: Option<&CancellationToken>,
) -> Result<ExitStatus> {
    let order = match resolve_order(state, project) {
        Some(order) => order,
        None => return Ok(ExitStatus::InvalidProjectOutputsSkipped),
    };

    setup_initial_build(state, &order, cancel)?;

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    while let Some(invalidated) = get_next_invalidated_project(state, &order) {
        let flags = invalidated.done(state, &order, cancel)?;
        if flags == BuildResultFlags::NONE {
            continue;
        }
        if flags.any_errors() {
            failed += 1;
        } else {
            succeeded += 1;
        }
    }

    state.host.disable_cache();
    report_summary(state, &order);

    Ok(exit_status(succeeded, failed))
}

/// Drive exactly one invalidated project, seeding the pending queue on the
/// first call. Returns `None` when nothing is pending.
pub fn build_next_project(
    state: &mut BuildState,
    cancel: Option<&CancellationToken>,
) -> Result<Option<(ResolvedPath, BuildResultFlags)>> {
    let order = state.get_build_order();
    if !state.seeded {
        setup_initial_build(state, &order, cancel)?;
    }
    match get_next_invalidated_project(state, &order) {
        Some(invalidated) => {
            let project = invalidated.project.clone();
            let flags = invalidated.done(state, &order, cancel)?;
            Ok(Some((project, flags)))
        }
        None => Ok(None),
    }
}

/// Delete every enumerable output of every project in the (sub-)order, or
/// list them under `--dry`. Inputs of any project are never deleted.
pub fn clean(state: &mut BuildState, project: Option<&ResolvedPath>) -> Result<ExitStatus> {
    let order = match resolve_order(state, project) {
        Some(order) => order,
        None => return Ok(ExitStatus::InvalidProjectOutputsSkipped),
    };
    let host = state.host.clone();

    let mut all_inputs: HashSet<PathBuf> = HashSet::new();
    let mut project_outputs: Vec<(ProjectKey, Vec<PathBuf>)> = Vec::new();
    for path in &order.order {
        let key = state.key_for(path);
        if let Ok(config) = state.parse_config(path) {
            all_inputs.extend(config.file_names.iter().cloned());
            project_outputs.push((key, config.output_file_names()));
        }
    }

    for (key, outputs) in project_outputs {
        for output in outputs {
            if all_inputs.contains(&output) || !host.file_exists(&output) {
                continue;
            }
            if state.options.dry {
                info!("A non-dry clean would delete '{}'", output.display());
            } else {
                host.delete_file(&output)?;
                debug!(file = %output.display(), "deleted output");
            }
        }
        state.project_status.remove(&key);
    }

    Ok(ExitStatus::Success)
}

fn resolve_order(
    state: &mut BuildState,
    project: Option<&ResolvedPath>,
) -> Option<Arc<BuildOrder>> {
    match project {
        None => Some(state.get_build_order()),
        Some(project) => state.get_build_order_for(project),
    }
}

/// Enable the scoped file-content cache and seed every project of the order
/// into the pending queue so the first pass visits everything.
fn setup_initial_build(
    state: &mut BuildState,
    order: &BuildOrder,
    cancel: Option<&CancellationToken>,
) -> Result<()> {
    if let Some(cancel) = cancel {
        if cancel.is_cancelled() {
            return Err(TsbuildError::Cancelled);
        }
    }
    state.host.enable_cache();
    for project in &order.order {
        let key = state.key_for(project);
        state.pending.enqueue(key, ReloadLevel::None);
    }
    state.seeded = true;
    debug!(projects = order.order.len(), "seeded initial build");
    Ok(())
}

fn exit_status(succeeded: usize, failed: usize) -> ExitStatus {
    if failed == 0 {
        ExitStatus::Success
    } else if succeeded > 0 {
        ExitStatus::DiagnosticsPresentOutputsGenerated
    } else {
        ExitStatus::DiagnosticsPresentOutputsSkipped
    }
}

pub fn report_summary(state: &mut BuildState, order: &BuildOrder) {
    let mut projects = Vec::with_capacity(order.order.len());
    for path in &order.order {
        let key = state.key_for(path);
        projects.push((key, path.clone()));
    }
    let show_timings = state.options.diagnostics || state.options.extended_diagnostics;
    state.reporter.report_summary(
        &projects,
        state.options.watch,
        &state.project_timings,
        show_timings,
    );
    state.needs_summary = false;
}

fn poll_cancel(cancel: Option<&CancellationToken>) -> Result<()> {
    if let Some(cancel) = cancel {
        if cancel.is_cancelled() {
            return Err(TsbuildError::Cancelled);
        }
    }
    Ok(())
}

fn from_anyhow(error: anyhow::Error) -> TsbuildError {
    // Cancellation crosses the builder boundary as an anyhow error; recover
    // it so `build` can report it distinctly.
    match error.downcast::<TsbuildError>() {
        Ok(known) => known,
        Err(error) => TsbuildError::Other(error),
    }
}

/// Record diagnostics, mark the project unbuildable and return the matching
/// error flag. Downstream propagation is skipped for error results.
fn build_errors(
    state: &mut BuildState,
    key: &ProjectKey,
    reason: &str,
    diagnostics: Vec<Diagnostic>,
    flag: BuildResultFlags,
) -> BuildResultFlags {
    state.project_status.insert(
        key.clone(),
        UpToDateStatus::Unbuildable {
            reason: reason.to_string(),
        },
    );
    state.reporter.record_diagnostics(key.clone(), diagnostics);
    state.reporter.report_errors(key);
    flag
}

fn input_freshness(
    host: &dyn BuildHost,
    config: &ParsedProjectConfig,
) -> (SystemTime, PathBuf) {
    let mut newest_input_time = missing_file_time();
    let mut newest_input_name = PathBuf::new();
    for input in &config.file_names {
        if let Some(mtime) = host.modified_time(input) {
            if mtime > newest_input_time {
                newest_input_time = mtime;
                newest_input_name = input.clone();
            }
        }
    }
    (newest_input_time, newest_input_name)
}

fn fold_decl_time(slot: &mut Option<SystemTime>, time: SystemTime) {
    *slot = Some(match *slot {
        Some(existing) => existing.max(time),
        None => time,
    });
}

/// Full compiler pipeline for one project.
fn execute_build(
    state: &mut BuildState,
    invalidated: &InvalidatedProject,
    order: &BuildOrder,
    cancel: Option<&CancellationToken>,
) -> Result<BuildResultFlags> {
    let config = invalidated.config.clone();
    let key = invalidated.key.clone();
    let project = invalidated.project.clone();
    let host = state.host.clone();

    if state.options.dry {
        info!(
            "A non-dry build would build project '{}'",
            project.display()
        );
        return Ok(BuildResultFlags::SUCCESS);
    }
    if config.file_names.is_empty() && !config.errors.iter().any(|d| d.is_error()) {
        return Ok(BuildResultFlags::NONE);
    }

    state.reporter.clear_project(&key);
    let started = host.now();
    info!("Building project '{}'...", project.display());

    state.builder.begin_project(&config);
    let old_program = state.programs.remove(&key);
    let program = state
        .builder
        .create_program(host.as_ref(), &config, old_program, &config.errors)
        .map_err(from_anyhow)?;
    if state.options.watch {
        state.programs.insert(key.clone(), program.clone());
    }

    poll_cancel(cancel)?;

    // Stage 1: config, options, global and syntactic problems together.
    let config_diags = program.config_file_diagnostics();
    let has_config_errors = config_diags.iter().any(|d| d.is_error());
    let mut stage = config_diags;
    stage.extend(program.options_diagnostics());
    stage.extend(program.global_diagnostics());
    stage.extend(program.syntactic_diagnostics());
    if stage.iter().any(|d| d.is_error()) {
        let flag = if has_config_errors {
            BuildResultFlags::CONFIG_FILE_ERRORS
        } else {
            BuildResultFlags::SYNTAX_ERRORS
        };
        return Ok(build_errors(state, &key, "syntactic errors", stage, flag));
    }

    poll_cancel(cancel)?;

    // Stage 2: semantic problems.
    let semantic = program.semantic_diagnostics();
    if semantic.iter().any(|d| d.is_error()) {
        return Ok(build_errors(
            state,
            &key,
            "semantic errors",
            semantic,
            BuildResultFlags::TYPE_ERRORS,
        ));
    }

    // Stage 3: emit into memory, declaration problems first.
    program.backup_state();
    let output = program.emit(cancel).map_err(from_anyhow)?;
    if output
        .declaration_diagnostics
        .iter()
        .any(|d| d.is_error())
    {
        program.restore_state();
        return Ok(build_errors(
            state,
            &key,
            "declaration file errors",
            output.declaration_diagnostics,
            BuildResultFlags::DECLARATION_EMIT_ERRORS,
        ));
    }

    let (emitted, declaration_changed, mut newest_decl_change_time) =
        write_emitted_files(state, &output)?;

    if output.emit_diagnostics.iter().any(|d| d.is_error()) {
        return Ok(build_errors(
            state,
            &key,
            "emit errors",
            output.emit_diagnostics,
            BuildResultFlags::EMIT_ERRORS,
        ));
    }

    if state.options.list_files {
        for input in program.input_files() {
            info!("FILE: {}", input.display());
        }
    }

    // Touch outputs the emit did not produce this time so downstream
    // timestamp comparisons see a consistent build instant.
    let now = host.now();
    for output_file in config.output_file_names() {
        if emitted.contains(&output_file) || !host.file_exists(&output_file) {
            continue;
        }
        host.set_modified_time(&output_file, now)
            .map_err(from_anyhow)?;
        if is_declaration_file(&output_file) {
            fold_decl_time(&mut newest_decl_change_time, now);
        }
    }

    if declaration_changed {
        newest_decl_change_time = Some(maximum_time());
    }
    finish_up_to_date(state, &key, &config, newest_decl_change_time, now);

    if let Ok(elapsed) = now.duration_since(started) {
        state.project_timings.insert(key.clone(), elapsed);
    }

    let mut flags = BuildResultFlags::SUCCESS;
    if !declaration_changed {
        flags = flags | BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED;
    }
    queue_referencing_projects(state, &key, &project, &config, order, declaration_changed);
    Ok(flags)
}

/// Write emitted files, skipping declaration outputs whose on-disk bytes
/// already equal the new text (their modification time is preserved and
/// becomes a candidate for `newest_decl_change_time`).
fn write_emitted_files(
    state: &mut BuildState,
    output: &EmitOutput,
) -> Result<(HashSet<PathBuf>, bool, Option<SystemTime>)> {
    let host = state.host.clone();
    let mut emitted: HashSet<PathBuf> = HashSet::new();
    let mut declaration_changed = false;
    let mut newest_decl_change_time: Option<SystemTime> = None;

    for file in &output.files {
        if is_declaration_file(&file.name) {
            match host.read_file(&file.name) {
                Some(existing) if existing == file.text => {
                    if let Some(mtime) = host.modified_time(&file.name) {
                        fold_decl_time(&mut newest_decl_change_time, mtime);
                    }
                }
                _ => {
                    host.write_file(&file.name, &file.text).map_err(from_anyhow)?;
                    declaration_changed = true;
                }
            }
        } else {
            host.write_file(&file.name, &file.text).map_err(from_anyhow)?;
        }
        emitted.insert(file.name.clone());
        if state.options.list_emitted_files {
            info!("TSFILE: {}", file.name.display());
        }
    }

    Ok((emitted, declaration_changed, newest_decl_change_time))
}

/// Set the post-action `UpToDate` status with freshly scanned input times.
fn finish_up_to_date(
    state: &mut BuildState,
    key: &ProjectKey,
    config: &ParsedProjectConfig,
    newest_decl_change_time: Option<SystemTime>,
    build_instant: SystemTime,
) {
    let host = state.host.clone();
    let (newest_input_time, newest_input_name) = input_freshness(host.as_ref(), config);
    let outputs = config.output_file_names();
    let first_output = outputs.first().cloned().unwrap_or_default();
    state.project_status.insert(
        key.clone(),
        UpToDateStatus::UpToDate(Freshness {
            newest_input_time,
            newest_input_name,
            newest_decl_change_time,
            oldest_output_name: first_output.clone(),
            newest_output_time: build_instant,
            newest_output_name: first_output,
        }),
    );
}

/// Bundle-only update. Falls back to a full build when the persisted
/// build-info turns out to be unusable.
fn execute_update_bundle(
    state: &mut BuildState,
    invalidated: &InvalidatedProject,
    order: &BuildOrder,
    cancel: Option<&CancellationToken>,
) -> Result<BuildResultFlags> {
    let config = invalidated.config.clone();
    let key = invalidated.key.clone();
    let project = invalidated.project.clone();
    let host = state.host.clone();

    if state.options.dry {
        info!(
            "A non-dry build would update the bundle of project '{}'",
            project.display()
        );
        return Ok(BuildResultFlags::SUCCESS);
    }

    state.builder.begin_project(&config);
    let output = state
        .builder
        .emit_using_build_info(host.as_ref(), &config)
        .map_err(from_anyhow)?;
    let Some(output) = output else {
        debug!(
            project = %project.display(),
            "build info unusable; converting bundle update into a full build"
        );
        return execute_build(state, invalidated, order, cancel);
    };

    state.reporter.clear_project(&key);
    info!("Updating bundle of project '{}'...", project.display());

    let (emitted, _declaration_changed, _) = write_emitted_files(state, &output)?;

    if output.emit_diagnostics.iter().any(|d| d.is_error()) {
        return Ok(build_errors(
            state,
            &key,
            "emit errors",
            output.emit_diagnostics.clone(),
            BuildResultFlags::EMIT_ERRORS | BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED,
        ));
    }

    // Only non-declaration outputs move; declaration timestamps are the
    // whole point of the bundle-only path.
    let now = host.now();
    let mut newest_decl_change_time: Option<SystemTime> = None;
    for output_file in config.output_file_names() {
        if is_declaration_file(&output_file) {
            if let Some(mtime) = host.modified_time(&output_file) {
                fold_decl_time(&mut newest_decl_change_time, mtime);
            }
            continue;
        }
        if emitted.contains(&output_file) || !host.file_exists(&output_file) {
            continue;
        }
        host.set_modified_time(&output_file, now)
            .map_err(from_anyhow)?;
    }

    finish_up_to_date(state, &key, &config, newest_decl_change_time, now);
    queue_referencing_projects(state, &key, &project, &config, order, false);
    Ok(BuildResultFlags::SUCCESS | BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED)
}

/// Timestamp-only update: touch every existing output to the current
/// instant, preserving what downstream content comparisons see.
fn execute_update_stamps(
    state: &mut BuildState,
    invalidated: &InvalidatedProject,
) -> Result<BuildResultFlags> {
    let config = invalidated.config.clone();
    let key = invalidated.key.clone();
    let project = invalidated.project.clone();
    let host = state.host.clone();

    if state.options.dry {
        info!(
            "A non-dry build would update timestamps of project '{}'",
            project.display()
        );
        return Ok(BuildResultFlags::SUCCESS);
    }

    if state.options.verbose {
        info!(
            "Updating output timestamps of project '{}'...",
            project.display()
        );
    }

    let now = host.now();
    let mut newest_decl_change_time: Option<SystemTime> = None;
    let outputs = config.output_file_names();
    // Pre-touch declaration times are what downstream content comparisons
    // must keep seeing.
    for output_file in &outputs {
        if is_declaration_file(output_file) {
            if let Some(mtime) = host.modified_time(output_file) {
                fold_decl_time(&mut newest_decl_change_time, mtime);
            }
        }
    }
    for output_file in &outputs {
        if host.file_exists(output_file) {
            host.set_modified_time(output_file, now).map_err(from_anyhow)?;
        }
    }

    finish_up_to_date(state, &key, &config, newest_decl_change_time, now);
    Ok(BuildResultFlags::SUCCESS | BuildResultFlags::DECLARATION_OUTPUT_UNCHANGED)
}

/// After an error-free action on a composite project, walk the projects
/// later in the build order and re-queue the ones that reference it,
/// adjusting their cached statuses to reflect what just happened upstream.
fn queue_referencing_projects(
    state: &mut BuildState,
    built_key: &ProjectKey,
    built_project: &ResolvedPath,
    built_config: &ParsedProjectConfig,
    order: &BuildOrder,
    declaration_changed: bool,
) {
    // Only composite projects can be referenced by other projects.
    if !built_config.options.composite {
        return;
    }
    let host = state.host.clone();

    let Some(index) = order
        .order
        .iter()
        .position(|p| &state.config_cache.key_for(host.as_ref(), p) == built_key)
    else {
        return;
    };

    for downstream in &order.order[index + 1..] {
        let downstream_key = state.key_for(downstream);
        if state.pending.get(&downstream_key).is_some() {
            continue;
        }
        let Ok(downstream_config) = state.parse_config(downstream) else {
            continue;
        };

        for reference in &downstream_config.references {
            if &state.key_for(&reference.path) != built_key {
                continue;
            }

            if let Some(status) = state.project_status.get(&downstream_key).cloned() {
                let replacement = match status {
                    UpToDateStatus::UpToDate(freshness) if !declaration_changed => {
                        Some(if reference.prepend {
                            UpToDateStatus::OutOfDateWithPrepend {
                                out_of_date_output: freshness.oldest_output_name.clone(),
                                newer_project: built_project.clone(),
                            }
                        } else {
                            UpToDateStatus::UpToDateWithUpstreamTypes(freshness)
                        })
                    }
                    UpToDateStatus::UpToDate(freshness)
                    | UpToDateStatus::UpToDateWithUpstreamTypes(freshness)
                        if declaration_changed =>
                    {
                        Some(UpToDateStatus::OutOfDateWithUpstream {
                            out_of_date_output: freshness.oldest_output_name.clone(),
                            newer_project: built_project.clone(),
                        })
                    }
                    UpToDateStatus::OutOfDateWithPrepend {
                        out_of_date_output, ..
                    } if declaration_changed => {
                        Some(UpToDateStatus::OutOfDateWithUpstream {
                            out_of_date_output,
                            newer_project: built_project.clone(),
                        })
                    }
                    UpToDateStatus::UpstreamBlocked { upstream_project }
                        if &state.key_for(&upstream_project) == built_key =>
                    {
                        // Unblocked; force a fresh evaluation.
                        state.project_status.remove(&downstream_key);
                        None
                    }
                    _ => None,
                };
                if let Some(replacement) = replacement {
                    state
                        .project_status
                        .insert(downstream_key.clone(), replacement);
                }
            }

            debug!(
                downstream = %downstream.display(),
                upstream = %built_project.display(),
                "queueing referencing project"
            );
            state
                .pending
                .enqueue(downstream_key.clone(), ReloadLevel::None);
            break;
        }
    }
}
