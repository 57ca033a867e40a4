// src/status/evaluator.rs

//! The up-to-date evaluator.
//!
//! Computes a project's [`UpToDateStatus`] from input/output timestamps,
//! upstream statuses and the persisted build-info version. Results are
//! memoized in the engine's status map; a cached entry short-circuits.
//!
//! The evaluation order is load-bearing: a missing or stale output is only
//! *tentative* until the upstream walk has had a chance to override it with
//! a higher-priority `UpstreamBlocked`/`UpstreamOutOfDate`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::trace;

use crate::compile::build_info;
use crate::config::{is_declaration_file, ParsedProjectConfig};
use crate::engine::state::BuildState;
use crate::host::{maximum_time, missing_file_time, BuildHost};
use crate::status::{Freshness, UpToDateStatus};
use crate::types::{ProjectKey, ResolvedPath};

/// Status of the project at `path`, resolving and parsing its config first.
/// A failed parse is `Unbuildable`.
pub fn project_up_to_date_status(
    state: &mut BuildState,
    path: &ResolvedPath,
) -> UpToDateStatus {
    let host = state.host.clone();
    let key = state.config_cache.key_for(host.as_ref(), path);
    match state.config_cache.parse(host.as_ref(), path) {
        Ok(config) => up_to_date_status(state, &config, &key),
        Err(diagnostic) => {
            let status = UpToDateStatus::Unbuildable {
                reason: diagnostic.message,
            };
            state.project_status.insert(key, status.clone());
            status
        }
    }
}

/// Status of an already-parsed project. Cached per key.
pub fn up_to_date_status(
    state: &mut BuildState,
    config: &Arc<ParsedProjectConfig>,
    key: &ProjectKey,
) -> UpToDateStatus {
    if let Some(status) = state.project_status.get(key) {
        return status.clone();
    }
    let status = compute(state, config, key);
    state.project_status.insert(key.clone(), status.clone());
    trace!(project = %key, ?status, "computed up-to-date status");
    status
}

fn compute(
    state: &mut BuildState,
    config: &Arc<ParsedProjectConfig>,
    key: &ProjectKey,
) -> UpToDateStatus {
    let host = state.host.clone();

    // 1. Inputs must exist; track the newest.
    let mut newest_input_time = missing_file_time();
    let mut newest_input_name = PathBuf::new();
    for input in &config.file_names {
        let Some(mtime) = host.modified_time(input) else {
            return UpToDateStatus::Unbuildable {
                reason: format!("input file '{}' does not exist", input.display()),
            };
        };
        if mtime > newest_input_time {
            newest_input_time = mtime;
            newest_input_name = input.clone();
        }
    }

    // 2. Pure reference aggregators have nothing of their own to build.
    if config.file_names.is_empty() && !config.raw_specified_inputs {
        return UpToDateStatus::ContainerOnly;
    }

    // 3. Walk expected outputs.
    let outputs = config.output_file_names();
    let mut oldest_output_time = maximum_time();
    let mut oldest_output_name = PathBuf::new();
    let mut newest_output_time = missing_file_time();
    let mut newest_output_name = PathBuf::new();
    let mut newest_decl_change_time: Option<SystemTime> = None;
    let mut missing_output: Option<PathBuf> = None;
    let mut stale_output: Option<PathBuf> = None;

    for output in &outputs {
        let Some(mtime) = host.modified_time(output) else {
            missing_output = Some(output.clone());
            break;
        };
        if mtime < newest_input_time {
            stale_output = Some(output.clone());
            break;
        }
        if mtime < oldest_output_time {
            oldest_output_time = mtime;
            oldest_output_name = output.clone();
        }
        if is_declaration_file(output) {
            newest_decl_change_time = Some(match newest_decl_change_time {
                Some(t) => t.max(mtime),
                None => mtime,
            });
        }
        if mtime > newest_output_time {
            newest_output_time = mtime;
            newest_output_name = output.clone();
        }
    }

    // 4. Upstream references; higher priority than anything found so far.
    let mut pseudo_up_to_date = false;
    let mut uses_prepend = false;
    let mut upstream_changed: Option<ResolvedPath> = None;

    if !config.references.is_empty() {
        // Cycle guard: re-entry sees this sentinel and skips the edge.
        state
            .project_status
            .insert(key.clone(), UpToDateStatus::ComputingUpstream);

        for reference in &config.references {
            if reference.prepend {
                uses_prepend = true;
            }
            let ref_status = project_up_to_date_status(state, &reference.path);
            match ref_status {
                UpToDateStatus::ComputingUpstream | UpToDateStatus::ContainerOnly => continue,
                UpToDateStatus::Unbuildable { .. } => {
                    state.project_status.remove(key);
                    return UpToDateStatus::UpstreamBlocked {
                        upstream_project: reference.path.clone(),
                    };
                }
                UpToDateStatus::UpToDate(ref freshness)
                | UpToDateStatus::UpToDateWithUpstreamTypes(ref freshness) => {
                    // A missing output already decides this project; only the
                    // blocked/out-of-date upstream checks above still apply.
                    if missing_output.is_some() {
                        continue;
                    }
                    if freshness.newest_input_time <= oldest_output_time {
                        continue;
                    }
                    let decl_time = freshness
                        .newest_decl_change_time
                        .unwrap_or_else(missing_file_time);
                    if decl_time <= oldest_output_time {
                        pseudo_up_to_date = true;
                        upstream_changed = Some(reference.path.clone());
                        continue;
                    }
                    state.project_status.remove(key);
                    return UpToDateStatus::OutOfDateWithUpstream {
                        out_of_date_output: oldest_output_name.clone(),
                        newer_project: reference.path.clone(),
                    };
                }
                _ => {
                    state.project_status.remove(key);
                    return UpToDateStatus::UpstreamOutOfDate {
                        upstream_project: reference.path.clone(),
                    };
                }
            }
        }

        state.project_status.remove(key);
    }

    // 5 / 6. Now the tentative findings become final.
    if let Some(missing) = missing_output {
        return UpToDateStatus::OutputMissing {
            missing_output: missing,
        };
    }
    if let Some(stale) = stale_output {
        return UpToDateStatus::OutOfDateWithSelf {
            out_of_date_output: stale,
            newer_input: newest_input_name.clone(),
        };
    }

    // 7. The config file and everything it extends must predate the oldest
    // output.
    if !outputs.is_empty() {
        for config_file in &config.extended_config_paths {
            let config_time = host
                .modified_time(config_file)
                .unwrap_or_else(missing_file_time);
            if config_time > oldest_output_time {
                return UpToDateStatus::OutOfDateWithSelf {
                    out_of_date_output: oldest_output_name.clone(),
                    newer_input: config_file.clone(),
                };
            }
        }
    }

    // 8. Build-info version gate, once per project lifetime.
    if state.build_info_checked.insert(key.clone()) {
        if let Some(build_info_path) = config.build_info_path() {
            if host.file_exists(&build_info_path) {
                if let Some(version) = build_info::read_version(host.as_ref(), &build_info_path) {
                    if version != state.builder.version() {
                        return UpToDateStatus::BuildInfoVersionMismatch { version };
                    }
                }
            }
        }
    }

    // 9. Prepend bundles must be rebuilt even though types are unchanged.
    if uses_prepend && pseudo_up_to_date {
        return UpToDateStatus::OutOfDateWithPrepend {
            out_of_date_output: oldest_output_name.clone(),
            newer_project: upstream_changed.unwrap_or_default(),
        };
    }

    // 10. Fully up to date, possibly pending a downstream timestamp bump.
    let freshness = Freshness {
        newest_input_time,
        newest_input_name,
        newest_decl_change_time,
        oldest_output_name,
        newest_output_time,
        newest_output_name,
    };
    if pseudo_up_to_date {
        UpToDateStatus::UpToDateWithUpstreamTypes(freshness)
    } else {
        UpToDateStatus::UpToDate(freshness)
    }
}
