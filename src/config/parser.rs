// src/config/parser.rs

//! Project configuration parsing.
//!
//! Turns a `tsconfig.json`-style file into a [`ParsedProjectConfig`]:
//! resolves the `extends` chain, cooks compiler options, expands
//! `include`/`exclude` globs into the input file list, and derives the
//! wildcard directories the watch orchestrator needs.
//!
//! Fatal problems (unreadable file, malformed JSON) are returned as a single
//! [`Diagnostic`] which the config cache stores in place of a parsed config.
//! Recoverable problems ("no inputs were found") land in
//! [`ParsedProjectConfig::errors`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::model::{
    has_source_extension, CompilerOptions, ParsedProjectConfig, ProjectReference,
    RawCompilerOptions, RawProjectConfig, WildcardDirectory,
};
use crate::config::paths::{normalize, resolve_project_path};
use crate::host::BuildHost;
use crate::types::Diagnostic;

pub const CANNOT_READ_FILE: u32 = 5083;
pub const FAILED_TO_PARSE: u32 = 5014;
pub const NO_INPUTS_FOUND: u32 = 18003;
pub const INVALID_INCLUDE_PATTERN: u32 = 5023;

pub fn parse_project_config(
    host: &dyn BuildHost,
    config_path: &Path,
) -> Result<ParsedProjectConfig, Diagnostic> {
    let project_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    let mut errors = Vec::new();
    let mut extended_config_paths = vec![config_path.to_path_buf()];
    let raw = read_raw(host, config_path)?;
    let raw = flatten_extends(host, config_path, raw, &mut extended_config_paths, &mut errors);

    let options = cook_options(&project_dir, raw.compiler_options.clone());

    let raw_specified_inputs = raw.files.is_some() || raw.include.is_some();
    let (file_names, wildcard_directories) =
        expand_inputs(host, &project_dir, &raw, &options, &mut errors);

    if file_names.is_empty() && raw_specified_inputs {
        errors.push(Diagnostic::error_in(
            config_path,
            NO_INPUTS_FOUND,
            format!(
                "No inputs were found in config file '{}'",
                config_path.display()
            ),
        ));
    }

    let references = raw
        .references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|r| ProjectReference {
            path: resolve_project_path(&project_dir, Path::new(&r.path)),
            prepend: r.prepend,
            circular: r.circular,
        })
        .collect();

    debug!(
        config = %config_path.display(),
        inputs = file_names.len(),
        "parsed project config"
    );

    Ok(ParsedProjectConfig {
        config_path: config_path.to_path_buf(),
        project_dir,
        file_names,
        options,
        references,
        wildcard_directories,
        extended_config_paths,
        errors,
        raw_specified_inputs,
    })
}

fn read_raw(host: &dyn BuildHost, path: &Path) -> Result<RawProjectConfig, Diagnostic> {
    let text = host.read_file(path).ok_or_else(|| {
        Diagnostic::error_in(
            path,
            CANNOT_READ_FILE,
            format!("Cannot read file '{}'", path.display()),
        )
    })?;
    serde_json::from_str(&text).map_err(|e| {
        Diagnostic::error_in(
            path,
            FAILED_TO_PARSE,
            format!("Failed to parse file '{}': {e}", path.display()),
        )
    })
}

/// Walk the `extends` chain, merging options (derived wins) and inheriting
/// `files`/`include`/`exclude` only when the derived config omits them.
/// Problems in the chain are recoverable diagnostics; the chain simply stops.
fn flatten_extends(
    host: &dyn BuildHost,
    config_path: &Path,
    mut raw: RawProjectConfig,
    extended_config_paths: &mut Vec<PathBuf>,
    errors: &mut Vec<Diagnostic>,
) -> RawProjectConfig {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    seen.insert(config_path.to_path_buf());

    let mut current_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut next = raw.extends.clone();

    while let Some(extends) = next {
        let base_path = normalize(&current_dir.join(&extends));
        if !seen.insert(base_path.clone()) {
            break;
        }
        match read_raw(host, &base_path) {
            Ok(base) => {
                extended_config_paths.push(base_path.clone());
                raw.compiler_options = std::mem::take(&mut raw.compiler_options)
                    .merged_over(base.compiler_options);
                if raw.files.is_none() {
                    raw.files = base.files;
                }
                if raw.include.is_none() {
                    raw.include = base.include;
                }
                if raw.exclude.is_none() {
                    raw.exclude = base.exclude;
                }
                current_dir = base_path.parent().map(Path::to_path_buf).unwrap_or_default();
                next = base.extends;
            }
            Err(diagnostic) => {
                errors.push(diagnostic);
                break;
            }
        }
    }

    raw
}

fn cook_options(project_dir: &Path, raw: RawCompilerOptions) -> CompilerOptions {
    let composite = raw.composite.unwrap_or(false);
    let resolve = |p: &String| normalize(&project_dir.join(p));
    CompilerOptions {
        out_dir: raw.out_dir.as_ref().map(resolve),
        out_file: raw.out_file.as_ref().map(resolve),
        declaration_dir: raw.declaration_dir.as_ref().map(resolve),
        declaration: raw.declaration.unwrap_or(false) || composite,
        composite,
        incremental: raw.incremental.unwrap_or(false) || composite,
        no_emit: raw.no_emit.unwrap_or(false),
        build_info_file: raw.ts_build_info_file.as_ref().map(resolve),
    }
}

fn expand_inputs(
    host: &dyn BuildHost,
    project_dir: &Path,
    raw: &RawProjectConfig,
    options: &CompilerOptions,
    errors: &mut Vec<Diagnostic>,
) -> (Vec<PathBuf>, Vec<WildcardDirectory>) {
    let mut file_names: Vec<PathBuf> = Vec::new();

    if let Some(files) = &raw.files {
        for file in files {
            file_names.push(normalize(&project_dir.join(file)));
        }
    }

    let include = match (&raw.include, &raw.files) {
        (Some(include), _) => include.clone(),
        (None, Some(_)) => Vec::new(),
        // Neither named: default to every source under the project.
        (None, None) => vec!["**/*".to_string()],
    };

    let mut wildcard_directories = Vec::new();
    if !include.is_empty() {
        let include_set = build_globset(&include, errors);
        let exclude_set = raw
            .exclude
            .as_ref()
            .and_then(|patterns| build_globset(patterns, errors));

        for pattern in &include {
            if let Some(dir) = wildcard_directory_of(project_dir, pattern) {
                if !wildcard_directories.contains(&dir) {
                    wildcard_directories.push(dir);
                }
            }
        }

        if let Some(include_set) = include_set {
            for candidate in host.read_directory(project_dir) {
                if !has_source_extension(&candidate) {
                    continue;
                }
                if under_output_dir(options, &candidate) {
                    continue;
                }
                let rel = match candidate.strip_prefix(project_dir) {
                    Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                    Err(_) => continue,
                };
                if !include_set.is_match(&rel) {
                    continue;
                }
                if let Some(exclude_set) = &exclude_set {
                    if exclude_set.is_match(&rel) {
                        continue;
                    }
                }
                if !file_names.contains(&candidate) {
                    file_names.push(candidate);
                }
            }
        }
    }

    file_names.sort();
    (file_names, wildcard_directories)
}

fn under_output_dir(options: &CompilerOptions, path: &Path) -> bool {
    options
        .out_dir
        .as_deref()
        .is_some_and(|d| path.starts_with(d))
        || options
            .declaration_dir
            .as_deref()
            .is_some_and(|d| path.starts_with(d))
}

fn build_globset(patterns: &[String], errors: &mut Vec<Diagnostic>) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => errors.push(Diagnostic::error(
                INVALID_INCLUDE_PATTERN,
                format!("Invalid pattern '{pattern}': {e}"),
            )),
        }
    }
    builder.build().ok()
}

/// The directory a glob pattern watches: its literal prefix, recursive when
/// the pattern descends (`**` or any nested wildcard segment). A pattern
/// with no wildcards names a literal file and needs no directory watch.
fn wildcard_directory_of(project_dir: &Path, pattern: &str) -> Option<WildcardDirectory> {
    let is_meta = |segment: &str| segment.contains(['*', '?', '[', '{']);
    let segments: Vec<&str> = pattern.split('/').collect();
    let first_meta = segments.iter().position(|s| is_meta(s))?;

    let mut dir = project_dir.to_path_buf();
    for segment in &segments[..first_meta] {
        dir.push(segment);
    }
    let recursive = segments[first_meta..].len() > 1 || pattern.contains("**");
    Some(WildcardDirectory {
        path: dir,
        recursive,
    })
}
