// src/status/mod.rs

pub mod evaluator;

pub use evaluator::{project_up_to_date_status, up_to_date_status};

use std::path::PathBuf;
use std::time::SystemTime;

use crate::types::ResolvedPath;

/// Timestamp detail carried by the up-to-date statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    pub newest_input_time: SystemTime,
    pub newest_input_name: PathBuf,
    /// Most recent time any declaration output's *content* changed;
    /// `maximum_time()` right after a build that rewrote declarations.
    pub newest_decl_change_time: Option<SystemTime>,
    pub oldest_output_name: PathBuf,
    pub newest_output_time: SystemTime,
    pub newest_output_name: PathBuf,
}

/// The up-to-date status of a project, as decided by the evaluator.
///
/// Exactly one status is cached per project key at any time; the cache is
/// cleared on invalidation, after a build action runs, and when an upstream
/// transition forces re-evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpToDateStatus {
    /// Config unparseable, an input file is missing, or the last build
    /// attempt produced diagnostics.
    Unbuildable { reason: String },
    /// No inputs and no outputs; exists solely to aggregate references.
    ContainerOnly,
    UpToDate(Freshness),
    /// Up to date for this project's own inputs, but upstream `.d.ts`
    /// timestamps moved (content did not); eligible for a timestamp-only
    /// update.
    UpToDateWithUpstreamTypes(Freshness),
    /// An upstream bundle prepended into this project's bundle changed.
    OutOfDateWithPrepend {
        out_of_date_output: PathBuf,
        newer_project: ResolvedPath,
    },
    OutputMissing { missing_output: PathBuf },
    OutOfDateWithSelf {
        out_of_date_output: PathBuf,
        newer_input: PathBuf,
    },
    OutOfDateWithUpstream {
        out_of_date_output: PathBuf,
        newer_project: ResolvedPath,
    },
    UpstreamOutOfDate { upstream_project: ResolvedPath },
    UpstreamBlocked { upstream_project: ResolvedPath },
    /// Sentinel written into the status map while upstream references are
    /// being evaluated; breaks reference cycles and is never observable
    /// outside the evaluator.
    ComputingUpstream,
    /// Persisted build-info was produced by a different compiler version.
    BuildInfoVersionMismatch { version: String },
}

impl UpToDateStatus {
    /// Up to date as far as this project's own rebuild is concerned.
    pub fn is_up_to_date(&self) -> bool {
        matches!(
            self,
            UpToDateStatus::UpToDate(_) | UpToDateStatus::UpToDateWithUpstreamTypes(_)
        )
    }

    pub fn freshness(&self) -> Option<&Freshness> {
        match self {
            UpToDateStatus::UpToDate(f) | UpToDateStatus::UpToDateWithUpstreamTypes(f) => Some(f),
            _ => None,
        }
    }
}
