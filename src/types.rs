// src/types.rs

use std::fmt;
use std::ops::BitOr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Canonical lookup key for a project: the resolved config path, case-folded
/// when the host file system is case-insensitive. All engine maps are keyed
/// by this.
pub type ProjectKey = String;

/// Absolute, normalized path to a project configuration file.
pub type ResolvedPath = PathBuf;

/// How much of a project's configuration must be re-processed before its
/// next build.
///
/// Levels are strictly ordered (`None < Partial < Full`) and the pending
/// queue only ever raises them; a later lower-level request never downgrades
/// an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReloadLevel {
    /// Re-evaluate up-to-date status only.
    #[default]
    None,
    /// Re-expand input file globs, keep the parsed options.
    Partial,
    /// Re-read the configuration file and rewire all watchers.
    Full,
}

/// Overall outcome of a `build` or `clean` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    DiagnosticsPresentOutputsSkipped,
    DiagnosticsPresentOutputsGenerated,
    InvalidProjectOutputsSkipped,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::DiagnosticsPresentOutputsSkipped => 1,
            ExitStatus::DiagnosticsPresentOutputsGenerated => 2,
            ExitStatus::InvalidProjectOutputsSkipped => 3,
        }
    }
}

/// Bit set describing what a single project build action produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildResultFlags(u32);

impl BuildResultFlags {
    pub const NONE: BuildResultFlags = BuildResultFlags(0);
    /// The action ran to completion without errors.
    pub const SUCCESS: BuildResultFlags = BuildResultFlags(1 << 0);
    /// Declaration outputs were byte-identical to what was already on disk.
    pub const DECLARATION_OUTPUT_UNCHANGED: BuildResultFlags = BuildResultFlags(1 << 1);

    pub const CONFIG_FILE_ERRORS: BuildResultFlags = BuildResultFlags(1 << 2);
    pub const SYNTAX_ERRORS: BuildResultFlags = BuildResultFlags(1 << 3);
    pub const TYPE_ERRORS: BuildResultFlags = BuildResultFlags(1 << 4);
    pub const DECLARATION_EMIT_ERRORS: BuildResultFlags = BuildResultFlags(1 << 5);
    pub const EMIT_ERRORS: BuildResultFlags = BuildResultFlags(1 << 6);

    const ANY_ERRORS: BuildResultFlags = BuildResultFlags(
        Self::CONFIG_FILE_ERRORS.0
            | Self::SYNTAX_ERRORS.0
            | Self::TYPE_ERRORS.0
            | Self::DECLARATION_EMIT_ERRORS.0
            | Self::EMIT_ERRORS.0,
    );

    pub fn contains(self, other: BuildResultFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn any_errors(self) -> bool {
        self.0 & Self::ANY_ERRORS.0 != 0
    }
}

impl BitOr for BuildResultFlags {
    type Output = BuildResultFlags;

    fn bitor(self, rhs: BuildResultFlags) -> BuildResultFlags {
        BuildResultFlags(self.0 | rhs.0)
    }
}

/// Cooperative cancellation signal accepted by `build`, `build_next_project`
/// and every action's `done`.
///
/// Cancellation is polled, never preemptive; a cancelled token makes the
/// engine return [`crate::errors::TsbuildError::Cancelled`] at the next poll
/// point while retaining all partial state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Message,
}

/// A single diagnostic produced by config parsing or the compiler pipeline.
///
/// Diagnostics are data, not errors: they are stored per project and never
/// unwind across project boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub message: String,
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            message: message.into(),
            file: None,
        }
    }

    pub fn error_in(file: impl Into<PathBuf>, code: u32, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            message: message.into(),
            file: Some(file.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}: TS{}: {}", file.display(), self.code, self.message),
            None => write!(f, "TS{}: {}", self.code, self.message),
        }
    }
}
