// src/compile/backend.rs

//! Pluggable compiler pipeline abstraction.
//!
//! The build driver talks to a [`ProgramBuilder`] instead of a concrete
//! compiler. Production wiring uses [`crate::compile::SimpleProgramBuilder`];
//! tests can provide their own implementation that fabricates diagnostics or
//! records emit calls. The engine only decides *when* to invoke the builder
//! and *what* to do with the produced files; it never inspects their
//! contents beyond declaration byte-equality.

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::ParsedProjectConfig;
use crate::host::BuildHost;
use crate::types::{CancellationToken, Diagnostic};

/// One output file produced by an emit, held in memory until the driver
/// decides whether to write it.
#[derive(Debug, Clone)]
pub struct EmittedFile {
    pub name: PathBuf,
    pub text: String,
}

/// Everything an emit produced.
#[derive(Debug, Clone, Default)]
pub struct EmitOutput {
    pub files: Vec<EmittedFile>,
    /// Problems from the emitter itself (failed writes are the driver's
    /// concern, these are semantic emit problems).
    pub emit_diagnostics: Vec<Diagnostic>,
    /// Problems generating declaration output; when non-empty the driver
    /// discards the emit entirely.
    pub declaration_diagnostics: Vec<Diagnostic>,
}

/// A compiled (or compiling) program for one project.
///
/// Diagnostics are staged; the driver stops at the first non-empty stage:
/// config ∪ options ∪ global ∪ syntactic, then semantic, then whatever
/// `emit` reports.
pub trait Program: Send + Sync {
    fn input_files(&self) -> &[PathBuf];
    fn config_file_diagnostics(&self) -> Vec<Diagnostic>;
    fn options_diagnostics(&self) -> Vec<Diagnostic>;
    fn global_diagnostics(&self) -> Vec<Diagnostic>;
    fn syntactic_diagnostics(&self) -> Vec<Diagnostic>;
    fn semantic_diagnostics(&self) -> Vec<Diagnostic>;

    /// Emit all outputs into memory.
    fn emit(&self, cancel: Option<&CancellationToken>) -> Result<EmitOutput>;

    /// Snapshot mutable program state before emit. Idempotent builders can
    /// leave these as the default no-ops.
    fn backup_state(&self) {}
    /// Restore the snapshot taken by `backup_state` (after declaration-emit
    /// errors).
    fn restore_state(&self) {}
}

/// Factory for [`Program`]s plus the bundle-only update path.
pub trait ProgramBuilder: Send + Sync + Debug {
    /// Compiler version recorded into build-info artifacts and compared by
    /// the version gate.
    fn version(&self) -> &str;

    /// Called before any work on a project, in strict build order. Gives the
    /// builder a chance to push module-resolution redirects for the project.
    fn begin_project(&self, _config: &ParsedProjectConfig) {}

    /// Compile a project. `old_program` is the retained program from the
    /// previous watch-mode build of the same project, when available.
    fn create_program(
        &self,
        host: &dyn BuildHost,
        config: &ParsedProjectConfig,
        old_program: Option<Arc<dyn Program>>,
        config_errors: &[Diagnostic],
    ) -> Result<Arc<dyn Program>>;

    /// Regenerate only non-declaration outputs from persisted build-info.
    /// `Ok(None)` means the build-info is unreadable and the caller must
    /// fall back to a full build.
    fn emit_using_build_info(
        &self,
        host: &dyn BuildHost,
        config: &ParsedProjectConfig,
    ) -> Result<Option<EmitOutput>>;
}
