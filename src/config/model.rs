// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{Diagnostic, ResolvedPath};

/// Extensions recognized as compilable sources.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["ts", "tsx"];

/// True for `.ts`/`.tsx` files, including `.d.ts`.
pub fn has_source_extension(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("ts" | "tsx"))
}

/// True for declaration files (`.d.ts`).
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".d.ts"))
}

/// Top-level project configuration as read from a `tsconfig.json`-style
/// file. This is the raw serde mapping; [`ParsedProjectConfig`] is the
/// cooked form the engine works with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProjectConfig {
    /// Base configuration this file inherits from.
    pub extends: Option<String>,

    /// Explicit input file list, relative to the config directory.
    pub files: Option<Vec<String>>,

    /// Glob patterns selecting input files.
    pub include: Option<Vec<String>>,

    /// Glob patterns removed from the `include` result.
    pub exclude: Option<Vec<String>>,

    pub compiler_options: RawCompilerOptions,

    /// Upstream projects this one depends on.
    pub references: Option<Vec<RawProjectReference>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCompilerOptions {
    pub out_dir: Option<String>,
    pub out_file: Option<String>,
    pub declaration_dir: Option<String>,
    pub declaration: Option<bool>,
    pub composite: Option<bool>,
    pub incremental: Option<bool>,
    pub no_emit: Option<bool>,
    pub ts_build_info_file: Option<String>,
}

impl RawCompilerOptions {
    /// Merge `self` over a base from an `extends` chain: fields set here win.
    pub fn merged_over(self, base: RawCompilerOptions) -> RawCompilerOptions {
        RawCompilerOptions {
            out_dir: self.out_dir.or(base.out_dir),
            out_file: self.out_file.or(base.out_file),
            declaration_dir: self.declaration_dir.or(base.declaration_dir),
            declaration: self.declaration.or(base.declaration),
            composite: self.composite.or(base.composite),
            incremental: self.incremental.or(base.incremental),
            no_emit: self.no_emit.or(base.no_emit),
            ts_build_info_file: self.ts_build_info_file.or(base.ts_build_info_file),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProjectReference {
    pub path: String,
    #[serde(default)]
    pub prepend: bool,
    #[serde(default)]
    pub circular: bool,
}

/// Cooked compiler options with paths resolved against the project
/// directory. `composite` implies both `declaration` and `incremental`.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub out_dir: Option<PathBuf>,
    pub out_file: Option<PathBuf>,
    pub declaration_dir: Option<PathBuf>,
    pub declaration: bool,
    pub composite: bool,
    pub incremental: bool,
    pub no_emit: bool,
    pub build_info_file: Option<PathBuf>,
}

/// A reference to an upstream project, with its config path already
/// resolved.
#[derive(Debug, Clone)]
pub struct ProjectReference {
    pub path: ResolvedPath,
    /// Upstream bundle output is concatenated into this project's bundle.
    pub prepend: bool,
    /// Edge is declared circular; cycle diagnostics through it are
    /// suppressed.
    pub circular: bool,
}

/// Directory watched for wildcard (`include` glob) input changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardDirectory {
    pub path: PathBuf,
    pub recursive: bool,
}

/// A successfully parsed project configuration.
#[derive(Debug, Clone)]
pub struct ParsedProjectConfig {
    pub config_path: ResolvedPath,
    pub project_dir: PathBuf,
    /// Absolute input file paths, sorted.
    pub file_names: Vec<PathBuf>,
    pub options: CompilerOptions,
    pub references: Vec<ProjectReference>,
    pub wildcard_directories: Vec<WildcardDirectory>,
    /// The config file itself plus everything in its `extends` chain.
    pub extended_config_paths: Vec<PathBuf>,
    /// Non-fatal diagnostics (e.g. "no inputs were found").
    pub errors: Vec<Diagnostic>,
    /// Whether the raw config named `files` or `include` at all. A config
    /// that named neither and has no inputs is a container project; one that
    /// asked for inputs and matched none is an error.
    pub raw_specified_inputs: bool,
}

impl ParsedProjectConfig {
    pub fn enables_emit(&self) -> bool {
        !self.options.no_emit
    }

    /// The persisted build-info artifact path, when incremental metadata is
    /// enabled for this project.
    pub fn build_info_path(&self) -> Option<PathBuf> {
        if !self.options.incremental {
            return None;
        }
        if let Some(explicit) = &self.options.build_info_file {
            return Some(explicit.clone());
        }
        let stem = self
            .config_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tsconfig");
        let name = format!("{stem}.tsbuildinfo");
        match &self.options.out_dir {
            Some(out_dir) => Some(out_dir.join(name)),
            None => Some(self.project_dir.join(name)),
        }
    }

    /// JavaScript output for one input file, `None` for declaration inputs.
    pub fn js_output_for(&self, input: &Path) -> Option<PathBuf> {
        if is_declaration_file(input) || !has_source_extension(input) {
            return None;
        }
        Some(self.map_to_output(input, self.options.out_dir.as_deref(), "js"))
    }

    /// Declaration output for one input file, when declarations are enabled.
    pub fn declaration_output_for(&self, input: &Path) -> Option<PathBuf> {
        if !self.options.declaration || is_declaration_file(input) || !has_source_extension(input)
        {
            return None;
        }
        let dir = self
            .options
            .declaration_dir
            .as_deref()
            .or(self.options.out_dir.as_deref());
        Some(self.map_to_output(input, dir, "d.ts"))
    }

    fn map_to_output(&self, input: &Path, dir: Option<&Path>, ext: &str) -> PathBuf {
        let mut mapped = match dir {
            Some(dir) => {
                let rel = input
                    .strip_prefix(&self.project_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(input.file_name().unwrap_or_default()));
                dir.join(rel)
            }
            None => input.to_path_buf(),
        };
        mapped.set_extension(ext);
        mapped
    }

    /// Every output this project is expected to produce, in a stable order:
    /// per-input `.js` and `.d.ts` (or the bundle pair for `outFile`),
    /// followed by the build-info artifact.
    pub fn output_file_names(&self) -> Vec<PathBuf> {
        let mut outputs = Vec::new();
        if self.enables_emit() && !self.file_names.is_empty() {
            if let Some(out_file) = &self.options.out_file {
                outputs.push(out_file.clone());
                if self.options.declaration {
                    let mut decl = out_file.clone();
                    decl.set_extension("d.ts");
                    outputs.push(decl);
                }
            } else {
                for input in &self.file_names {
                    if let Some(js) = self.js_output_for(input) {
                        outputs.push(js);
                    }
                    if let Some(decl) = self.declaration_output_for(input) {
                        outputs.push(decl);
                    }
                }
            }
        }
        if let Some(build_info) = self.build_info_path() {
            outputs.push(build_info);
        }
        outputs
    }
}
