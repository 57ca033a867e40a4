// src/graph/order.rs

//! Build-order construction.
//!
//! A three-color depth-first search over project references, producing a
//! leaves-first topological order of every project reachable from the
//! roots. Cycles are reported as a diagnostic (once per cycle) and the walk
//! terminates; references whose configs fail to parse are treated as leaves
//! so the driver can surface their config errors in order.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::ConfigCache;
use crate::host::BuildHost;
use crate::types::{Diagnostic, ProjectKey, ResolvedPath};

pub const CIRCULAR_REFERENCES: u32 = 6202;

/// The result of a build-order computation: the order itself plus any cycle
/// diagnostics found along the way.
#[derive(Debug, Clone, Default)]
pub struct BuildOrder {
    /// Leaves-first: for every reference edge `a → b`, `b` precedes `a`.
    pub order: Vec<ResolvedPath>,
    pub circular_diagnostics: Vec<Diagnostic>,
}

impl BuildOrder {
    pub fn contains(&self, path: &ResolvedPath) -> bool {
        self.order.iter().any(|p| p == path)
    }
}

struct Walker<'a> {
    host: &'a dyn BuildHost,
    cache: &'a mut ConfigCache,
    temporary: HashSet<ProjectKey>,
    permanent: HashSet<ProjectKey>,
    stack: Vec<ResolvedPath>,
    result: BuildOrder,
}

/// Compute the build order for the transitive closure of `roots`.
pub fn create_build_order(
    host: &dyn BuildHost,
    cache: &mut ConfigCache,
    roots: &[ResolvedPath],
) -> BuildOrder {
    let mut walker = Walker {
        host,
        cache,
        temporary: HashSet::new(),
        permanent: HashSet::new(),
        stack: Vec::new(),
        result: BuildOrder::default(),
    };
    for root in roots {
        walker.visit(root, false);
    }
    debug!(projects = walker.result.order.len(), "computed build order");
    walker.result
}

impl Walker<'_> {
    fn visit(&mut self, project: &ResolvedPath, in_circular_context: bool) {
        let key = self.cache.key_for(self.host, project);
        if self.permanent.contains(&key) {
            return;
        }
        if self.temporary.contains(&key) {
            // Back edge. Suppressed when some reference on the current path
            // was declared circular.
            if !in_circular_context {
                let mut cycle: Vec<String> = self
                    .stack
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                cycle.push(project.display().to_string());
                let message = format!(
                    "Project references may not form a circular graph. Cycle detected: {}",
                    cycle.join(" -> ")
                );
                warn!(%message, "circular project reference");
                self.result
                    .circular_diagnostics
                    .push(Diagnostic::error_in(project, CIRCULAR_REFERENCES, message));
            }
            return;
        }

        self.temporary.insert(key.clone());
        self.stack.push(project.clone());

        // Unresolvable configs stay leaves; the driver reports their parse
        // diagnostic when it reaches them in order.
        if let Ok(config) = self.cache.parse(self.host, project) {
            let references = config.references.clone();
            for reference in &references {
                self.visit(&reference.path, in_circular_context || reference.circular);
            }
        }

        self.stack.pop();
        self.permanent.insert(key);
        self.result.order.push(project.clone());
    }
}
