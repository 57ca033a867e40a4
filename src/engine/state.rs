// src/engine/state.rs

//! The engine's mutable state.
//!
//! Every map, queue and cache the build engine mutates lives in one
//! [`BuildState`] owned by a single caller and passed by `&mut` into every
//! operation. Nothing engine-side is global; watchers and caches are
//! explicitly scoped to this struct.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::compile::{Program, ProgramBuilder};
use crate::config::{ConfigCache, ConfigEntry, WildcardDirectory};
use crate::engine::invalidate::PendingQueue;
use crate::engine::reporter::Reporter;
use crate::graph::{create_build_order, BuildOrder};
use crate::host::CachingHost;
use crate::status::UpToDateStatus;
use crate::types::{ProjectKey, ResolvedPath};

/// Engine-visible build options, mirroring the CLI surface.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Suppress all writes; log what would happen instead.
    pub dry: bool,
    /// Disable all up-to-date short-circuiting.
    pub force: bool,
    pub verbose: bool,
    /// Retain builder programs between builds and keep watching after the
    /// initial pass.
    pub watch: bool,
    pub preserve_watch_output: bool,
    pub list_files: bool,
    pub list_emitted_files: bool,
    pub pretty: bool,
    /// Treat every project as incremental even when its options don't say so.
    pub incremental: bool,
    pub trace_resolution: bool,
    pub diagnostics: bool,
    pub extended_diagnostics: bool,
}

/// What the watch orchestrator is interested in for one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectWatchSet {
    pub config_paths: Vec<PathBuf>,
    pub input_files: HashSet<PathBuf>,
    pub wildcard_directories: Vec<WildcardDirectory>,
}

pub struct BuildState {
    pub host: Arc<CachingHost>,
    pub builder: Arc<dyn ProgramBuilder>,
    pub options: BuildOptions,
    pub root_projects: Vec<ResolvedPath>,

    pub config_cache: ConfigCache,
    /// Memoized full build order; cleared by any `Full` invalidation.
    pub build_order: Option<Arc<BuildOrder>>,
    /// Authoritative status memo; at most one entry per key.
    pub project_status: HashMap<ProjectKey, UpToDateStatus>,
    pub pending: PendingQueue,
    /// Keys whose build-info version gate has already run this lifetime.
    pub build_info_checked: HashSet<ProjectKey>,
    /// Builder programs retained for reuse between watch-mode builds.
    pub programs: HashMap<ProjectKey, Arc<dyn Program>>,

    pub reporter: Reporter,
    pub project_timings: HashMap<ProjectKey, Duration>,

    /// Watch mode: true once watchers have been installed.
    pub watching: bool,
    pub watch_sets: HashMap<ProjectKey, ProjectWatchSet>,
    pub needs_summary: bool,
    /// Whether `setup_initial_build` has seeded the pending queue.
    pub seeded: bool,
}

impl BuildState {
    pub fn new(
        host: Arc<CachingHost>,
        builder: Arc<dyn ProgramBuilder>,
        options: BuildOptions,
        root_projects: Vec<ResolvedPath>,
    ) -> Self {
        Self {
            host,
            builder,
            options,
            root_projects,
            config_cache: ConfigCache::new(),
            build_order: None,
            project_status: HashMap::new(),
            pending: PendingQueue::default(),
            build_info_checked: HashSet::new(),
            programs: HashMap::new(),
            reporter: Reporter::default(),
            project_timings: HashMap::new(),
            watching: false,
            watch_sets: HashMap::new(),
            needs_summary: false,
            seeded: false,
        }
    }

    pub fn key_for(&mut self, path: &ResolvedPath) -> ProjectKey {
        let host = self.host.clone();
        self.config_cache.key_for(host.as_ref(), path)
    }

    pub fn parse_config(&mut self, path: &ResolvedPath) -> ConfigEntry {
        let host = self.host.clone();
        self.config_cache.parse(host.as_ref(), path)
    }

    /// The full build order from the root projects; memoized until a `Full`
    /// invalidation clears it. Cycle diagnostics are (re)recorded with the
    /// reporter each time the order is actually computed.
    pub fn get_build_order(&mut self) -> Arc<BuildOrder> {
        if let Some(order) = &self.build_order {
            return order.clone();
        }
        let host = self.host.clone();
        let roots = self.root_projects.clone();
        let order = Arc::new(create_build_order(
            host.as_ref(),
            &mut self.config_cache,
            &roots,
        ));
        self.reporter
            .set_cycle_diagnostics(order.circular_diagnostics.clone());
        self.build_order = Some(order.clone());
        order
    }

    /// Build order restricted to one project's transitive closure. `None`
    /// when the project is not part of the full order.
    pub fn get_build_order_for(&mut self, project: &ResolvedPath) -> Option<Arc<BuildOrder>> {
        let full = self.get_build_order();
        if !full.contains(project) {
            return None;
        }
        let host = self.host.clone();
        let sub = create_build_order(
            host.as_ref(),
            &mut self.config_cache,
            std::slice::from_ref(project),
        );
        Some(Arc::new(sub))
    }
}
