// src/compile/simple.rs

//! Reference `ProgramBuilder` implementation.
//!
//! A deliberately small compiler stand-in that keeps the engine exercisable
//! end-to-end: `.ts` inputs are copied to `.js`, declaration output is the
//! `export`-ed surface lines only (so edits to internal code leave `.d.ts`
//! bytes untouched), `outFile` projects concatenate their inputs with any
//! `prepend` upstream bundles, and a build-info artifact records blake3
//! content signatures. Diagnostics come from explicit in-source markers,
//! which makes every error stage reachable deterministically:
//!
//! ```text
//! // @syntax-error: unexpected token
//! // @type-error: number is not assignable to string
//! // @declaration-error: exported type is private
//! // @emit-error: cannot lower feature
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::compile::backend::{EmitOutput, EmittedFile, Program, ProgramBuilder};
use crate::compile::build_info::{BuildInfo, BundleInfo};
use crate::config::{is_declaration_file, parse_project_config, ParsedProjectConfig};
use crate::errors::TsbuildError;
use crate::host::BuildHost;
use crate::types::{CancellationToken, Diagnostic};

const SYNTAX_ERROR: u32 = 1002;
const TYPE_ERROR: u32 = 2322;
const DECLARATION_ERROR: u32 = 4025;
const EMIT_ERROR: u32 = 5033;
const MISSING_INPUT: u32 = 6053;

#[derive(Debug)]
pub struct SimpleProgramBuilder {
    version: String,
}

impl Default for SimpleProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleProgramBuilder {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// A builder reporting an arbitrary version string; used to exercise the
    /// build-info version gate.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl ProgramBuilder for SimpleProgramBuilder {
    fn version(&self) -> &str {
        &self.version
    }

    fn create_program(
        &self,
        host: &dyn BuildHost,
        config: &ParsedProjectConfig,
        _old_program: Option<Arc<dyn Program>>,
        config_errors: &[Diagnostic],
    ) -> Result<Arc<dyn Program>> {
        let mut sources = Vec::new();
        let mut global_diagnostics = Vec::new();
        for input in &config.file_names {
            match host.read_file(input) {
                Some(text) => sources.push((input.clone(), text)),
                None => global_diagnostics.push(Diagnostic::error_in(
                    input,
                    MISSING_INPUT,
                    format!("File '{}' not found", input.display()),
                )),
            }
        }

        // Upstream projects build strictly before this one, so their bundle
        // outputs are current on disk right now; snapshot the prepended
        // texts while the host is at hand.
        let prepends = if config.options.out_file.is_some() {
            collect_prepends(host, config)
        } else {
            Vec::new()
        };

        debug!(
            project = %config.config_path.display(),
            inputs = sources.len(),
            prepends = prepends.len(),
            "created program"
        );
        Ok(Arc::new(SimpleProgram {
            builder_version: self.version.clone(),
            config: Arc::new(config.clone()),
            config_errors: config_errors.to_vec(),
            global_diagnostics,
            input_files: config.file_names.clone(),
            sources,
            prepends,
        }))
    }

    fn emit_using_build_info(
        &self,
        host: &dyn BuildHost,
        config: &ParsedProjectConfig,
    ) -> Result<Option<EmitOutput>> {
        let Some(build_info_path) = config.build_info_path() else {
            return Ok(None);
        };
        let Some(build_info) = BuildInfo::load(host, &build_info_path) else {
            return Ok(None);
        };
        if build_info.version != self.version {
            return Ok(None);
        }
        let Some(bundle) = build_info.bundle else {
            return Ok(None);
        };
        let Some(out_file) = config.options.out_file.clone() else {
            return Ok(None);
        };

        let mut text = String::new();
        for prepend in &bundle.prepend_outputs {
            match host.read_file(PathBuf::from(prepend).as_path()) {
                Some(upstream) => text.push_str(&upstream),
                None => return Ok(None),
            }
        }
        text.push_str(&bundle.js_text);

        debug!(
            project = %config.config_path.display(),
            "regenerated bundle from build info"
        );
        Ok(Some(EmitOutput {
            files: vec![EmittedFile {
                name: out_file,
                text,
            }],
            ..EmitOutput::default()
        }))
    }
}

/// One prepended upstream bundle: output paths and their texts as read when
/// the program was created.
struct PrependedBundle {
    js_path: PathBuf,
    js_text: String,
    decl_text: String,
}

fn collect_prepends(host: &dyn BuildHost, config: &ParsedProjectConfig) -> Vec<PrependedBundle> {
    let mut out = Vec::new();
    for reference in &config.references {
        if !reference.prepend {
            continue;
        }
        let Ok(upstream) = parse_project_config(host, &reference.path) else {
            continue;
        };
        let Some(js_path) = upstream.options.out_file else {
            continue;
        };
        let mut decl_path = js_path.clone();
        decl_path.set_extension("d.ts");
        out.push(PrependedBundle {
            js_text: host.read_file(&js_path).unwrap_or_default(),
            decl_text: host.read_file(&decl_path).unwrap_or_default(),
            js_path,
        });
    }
    out
}

struct SimpleProgram {
    builder_version: String,
    config: Arc<ParsedProjectConfig>,
    config_errors: Vec<Diagnostic>,
    global_diagnostics: Vec<Diagnostic>,
    input_files: Vec<PathBuf>,
    sources: Vec<(PathBuf, String)>,
    prepends: Vec<PrependedBundle>,
}

impl SimpleProgram {
    fn marker_diagnostics(&self, marker: &str, code: u32) -> Vec<Diagnostic> {
        let tag = format!("// @{marker}");
        let mut out = Vec::new();
        for (path, text) in &self.sources {
            for line in text.lines() {
                let line = line.trim_start();
                if let Some(rest) = line.strip_prefix(&tag) {
                    let message = rest.trim_start_matches(':').trim();
                    let message = if message.is_empty() {
                        marker.replace('-', " ")
                    } else {
                        message.to_string()
                    };
                    out.push(Diagnostic::error_in(path, code, message));
                }
            }
        }
        out
    }

    /// The declaration surface of a source: its `export` lines, verbatim.
    fn declaration_text(text: &str) -> String {
        let mut out = String::new();
        for line in text.lines() {
            if line.trim_start().starts_with("export") {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

impl Program for SimpleProgram {
    fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    fn config_file_diagnostics(&self) -> Vec<Diagnostic> {
        self.config_errors.clone()
    }

    fn options_diagnostics(&self) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn global_diagnostics(&self) -> Vec<Diagnostic> {
        self.global_diagnostics.clone()
    }

    fn syntactic_diagnostics(&self) -> Vec<Diagnostic> {
        self.marker_diagnostics("syntax-error", SYNTAX_ERROR)
    }

    fn semantic_diagnostics(&self) -> Vec<Diagnostic> {
        self.marker_diagnostics("type-error", TYPE_ERROR)
    }

    fn emit(&self, cancel: Option<&CancellationToken>) -> Result<EmitOutput> {
        if let Some(cancel) = cancel {
            if cancel.is_cancelled() {
                return Err(TsbuildError::Cancelled.into());
            }
        }

        let mut output = EmitOutput::default();
        if self.config.options.declaration {
            output.declaration_diagnostics =
                self.marker_diagnostics("declaration-error", DECLARATION_ERROR);
        }
        output.emit_diagnostics = self.marker_diagnostics("emit-error", EMIT_ERROR);
        if !self.config.enables_emit() {
            return Ok(output);
        }

        let mut build_info = BuildInfo::new(&self.builder_version);
        for (path, text) in &self.sources {
            build_info.file_signatures.insert(
                path.to_string_lossy().replace('\\', "/"),
                blake3::hash(text.as_bytes()).to_hex().to_string(),
            );
        }

        if let Some(out_file) = self.config.options.out_file.clone() {
            let mut own_js = String::new();
            let mut own_decl = String::new();
            for (path, text) in &self.sources {
                if is_declaration_file(path) {
                    continue;
                }
                own_js.push_str(text);
                if !own_js.ends_with('\n') {
                    own_js.push('\n');
                }
                own_decl.push_str(&Self::declaration_text(text));
            }

            let mut bundle_js = String::new();
            let mut bundle_decl = String::new();
            for prepend in &self.prepends {
                bundle_js.push_str(&prepend.js_text);
                bundle_decl.push_str(&prepend.decl_text);
            }
            bundle_js.push_str(&own_js);
            bundle_decl.push_str(&own_decl);

            output.files.push(EmittedFile {
                name: out_file.clone(),
                text: bundle_js,
            });
            if self.config.options.declaration {
                let mut decl_file = out_file;
                decl_file.set_extension("d.ts");
                output.files.push(EmittedFile {
                    name: decl_file,
                    text: bundle_decl,
                });
            }
            build_info.bundle = Some(BundleInfo {
                js_text: own_js,
                prepend_outputs: self
                    .prepends
                    .iter()
                    .map(|p| p.js_path.to_string_lossy().replace('\\', "/"))
                    .collect(),
            });
        } else {
            for (path, text) in &self.sources {
                if is_declaration_file(path) {
                    continue;
                }
                if let Some(js) = self.config.js_output_for(path) {
                    output.files.push(EmittedFile {
                        name: js,
                        text: text.clone(),
                    });
                }
                if let Some(decl) = self.config.declaration_output_for(path) {
                    output.files.push(EmittedFile {
                        name: decl,
                        text: Self::declaration_text(text),
                    });
                }
            }
        }

        if let Some(build_info_path) = self.config.build_info_path() {
            output.files.push(EmittedFile {
                name: build_info_path,
                text: build_info.to_json(),
            });
        }

        Ok(output)
    }
}
