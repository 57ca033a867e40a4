// src/engine/reporter.rs

//! Per-project diagnostic storage and user-facing status reporting.
//!
//! Diagnostics are recorded under the project key and reported at most once
//! per build of that project (the `errors_reported` guard). Status lines are
//! verbose-gated and formatted from the status variant; the final summary
//! walks the build order, reports anything not yet reported, and emits
//! either a watch-style or an error-count summary.

use std::path::Path;
use std::time::Duration;

use tracing::{error, info};

use crate::status::UpToDateStatus;
use crate::types::{Diagnostic, ProjectKey, ResolvedPath};

#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: std::collections::HashMap<ProjectKey, Vec<Diagnostic>>,
    errors_reported: std::collections::HashSet<ProjectKey>,
    cycle_diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    /// Replace the stored diagnostics for a project.
    pub fn record_diagnostics(&mut self, key: ProjectKey, diagnostics: Vec<Diagnostic>) {
        self.errors_reported.remove(&key);
        self.diagnostics.insert(key, diagnostics);
    }

    /// Forget a project's diagnostics (it is about to rebuild).
    pub fn clear_project(&mut self, key: &ProjectKey) {
        self.diagnostics.remove(key);
        self.errors_reported.remove(key);
    }

    pub fn diagnostics_of(&self, key: &ProjectKey) -> &[Diagnostic] {
        self.diagnostics.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A project is errored iff its diagnostics entry is non-empty.
    pub fn has_errors(&self, key: &ProjectKey) -> bool {
        !self.diagnostics_of(key).is_empty()
    }

    pub fn error_count(&self, key: &ProjectKey) -> usize {
        self.diagnostics_of(key)
            .iter()
            .filter(|d| d.is_error())
            .count()
    }

    /// Report a project's stored diagnostics, once.
    pub fn report_errors(&mut self, key: &ProjectKey) {
        if self.errors_reported.contains(key) {
            return;
        }
        let diagnostics = self.diagnostics.get(key).cloned().unwrap_or_default();
        if diagnostics.is_empty() {
            return;
        }
        self.errors_reported.insert(key.clone());
        for diagnostic in &diagnostics {
            error!("{diagnostic}");
        }
    }

    pub fn set_cycle_diagnostics(&mut self, diagnostics: Vec<Diagnostic>) {
        self.cycle_diagnostics = diagnostics;
    }

    /// Verbose-gated status line for a project.
    pub fn report_status(&self, verbose: bool, project: &Path, status: &UpToDateStatus) {
        if verbose {
            info!("{}", status_message(project, status));
        }
    }

    pub fn report_watch_status(&self, message: &str) {
        info!("{message}");
    }

    /// Clear the terminal between watch-mode rebuilds.
    pub fn clear_screen(&self, preserve_watch_output: bool) {
        if !preserve_watch_output {
            print!("\x1B[2J\x1B[3J\x1B[H");
        }
    }

    /// Final summary over the build order. Reports any stored diagnostics
    /// not yet reported, then the error count (or watch status line).
    /// Returns the total number of errors.
    pub fn report_summary(
        &mut self,
        projects: &[(ProjectKey, ResolvedPath)],
        watch: bool,
        timings: &std::collections::HashMap<ProjectKey, Duration>,
        show_timings: bool,
    ) -> usize {
        for diagnostic in self.cycle_diagnostics.clone() {
            error!("{diagnostic}");
        }
        let mut total = self.cycle_diagnostics.iter().filter(|d| d.is_error()).count();

        for (key, _project) in projects {
            self.report_errors(key);
            total += self.error_count(key);
        }

        if show_timings {
            for (key, project) in projects {
                if let Some(elapsed) = timings.get(key) {
                    info!(
                        "Project '{}' built in {}ms",
                        project.display(),
                        elapsed.as_millis()
                    );
                }
            }
        }

        if watch {
            let plural = if total == 1 { "" } else { "s" };
            self.report_watch_status(&format!(
                "Found {total} error{plural}. Watching for file changes."
            ));
        } else if total > 0 {
            info!("Found {total} error{}.", if total == 1 { "" } else { "s" });
        }

        total
    }
}

/// Human-readable explanation of an up-to-date status.
pub fn status_message(project: &Path, status: &UpToDateStatus) -> String {
    let name = project.display();
    match status {
        UpToDateStatus::Unbuildable { reason } => {
            format!("Project '{name}' can't be built: {reason}")
        }
        UpToDateStatus::ContainerOnly => {
            format!("Project '{name}' only aggregates references and has nothing to build")
        }
        UpToDateStatus::UpToDate(f) => format!(
            "Project '{name}' is up to date because newest input '{}' is older than oldest output '{}'",
            f.newest_input_name.display(),
            f.oldest_output_name.display()
        ),
        UpToDateStatus::UpToDateWithUpstreamTypes(_) => format!(
            "Project '{name}' is up to date with .d.ts files from its dependencies"
        ),
        UpToDateStatus::OutOfDateWithPrepend { newer_project, .. } => format!(
            "Project '{name}' is out of date because output of its prepended project '{}' has changed",
            newer_project.display()
        ),
        UpToDateStatus::OutputMissing { missing_output } => format!(
            "Project '{name}' is out of date because output file '{}' does not exist",
            missing_output.display()
        ),
        UpToDateStatus::OutOfDateWithSelf {
            out_of_date_output,
            newer_input,
        } => format!(
            "Project '{name}' is out of date because output '{}' is older than input '{}'",
            out_of_date_output.display(),
            newer_input.display()
        ),
        UpToDateStatus::OutOfDateWithUpstream { newer_project, .. } => format!(
            "Project '{name}' is out of date because output of its dependency '{}' has changed",
            newer_project.display()
        ),
        UpToDateStatus::UpstreamOutOfDate { upstream_project } => format!(
            "Project '{name}' is out of date because its dependency '{}' is out of date",
            upstream_project.display()
        ),
        UpToDateStatus::UpstreamBlocked { upstream_project } => format!(
            "Project '{name}' can't be built because its dependency '{}' has errors",
            upstream_project.display()
        ),
        UpToDateStatus::ComputingUpstream => {
            format!("Project '{name}' is being checked against its dependencies")
        }
        UpToDateStatus::BuildInfoVersionMismatch { version } => format!(
            "Project '{name}' is out of date because it was built with version '{version}'"
        ),
    }
}
