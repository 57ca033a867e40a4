// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::engine::BuildOptions;

/// Command-line arguments for `tsbuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tsbuild",
    version,
    about = "Incremental build orchestrator for TypeScript-style project references.",
    long_about = None
)]
pub struct CliArgs {
    /// Root projects to build: config files or project directories.
    ///
    /// Defaults to the current directory.
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<String>,

    /// Show what would be built (or deleted with --clean) without writing
    /// anything.
    #[arg(long)]
    pub dry: bool,

    /// Build all projects, ignoring up-to-date checks.
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Explain why each project is (or is not) rebuilt.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Delete the outputs of all projects instead of building.
    #[arg(long)]
    pub clean: bool,

    /// Keep running and rebuild on file changes.
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Do not clear the screen between watch-mode rebuilds.
    #[arg(long = "preserveWatchOutput", alias = "preserve-watch-output")]
    pub preserve_watch_output: bool,

    /// Print names of emitted files.
    #[arg(long = "listEmittedFiles", alias = "list-emitted-files")]
    pub list_emitted_files: bool,

    /// Print names of files that are part of each compilation.
    #[arg(long = "listFiles", alias = "list-files")]
    pub list_files: bool,

    /// Stylized diagnostic output.
    #[arg(long)]
    pub pretty: bool,

    /// Treat every project as incremental.
    #[arg(long)]
    pub incremental: bool,

    /// Trace module resolution inside the compiler.
    #[arg(long = "traceResolution", alias = "trace-resolution")]
    pub trace_resolution: bool,

    /// Print per-project build timing information.
    #[arg(long)]
    pub diagnostics: bool,

    /// Print extended build timing information.
    #[arg(long = "extendedDiagnostics", alias = "extended-diagnostics")]
    pub extended_diagnostics: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TSBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            dry: self.dry,
            force: self.force,
            verbose: self.verbose,
            watch: self.watch,
            preserve_watch_output: self.preserve_watch_output,
            list_files: self.list_files,
            list_emitted_files: self.list_emitted_files,
            pretty: self.pretty,
            incremental: self.incremental,
            trace_resolution: self.trace_resolution,
            diagnostics: self.diagnostics,
            extended_diagnostics: self.extended_diagnostics,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
