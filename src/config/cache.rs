// src/config/cache.rs

//! Path and config cache.
//!
//! Memoizes resolved-path → canonical-key mappings and parsed project
//! configurations. An entry is either a parsed config or the first fatal
//! diagnostic the parser produced. Entries are populated lazily and evicted
//! only by an explicit `Full` invalidation of that project.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::ParsedProjectConfig;
use crate::config::parser::parse_project_config;
use crate::config::paths::canonical_key;
use crate::host::BuildHost;
use crate::types::{Diagnostic, ProjectKey, ResolvedPath};

/// A cached parse result: the config, or the fatal diagnostic that replaced
/// it.
pub type ConfigEntry = Result<Arc<ParsedProjectConfig>, Diagnostic>;

#[derive(Debug, Default)]
pub struct ConfigCache {
    keys: HashMap<ResolvedPath, ProjectKey>,
    entries: HashMap<ProjectKey, ConfigEntry>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical key for a resolved config path; memoized.
    pub fn key_for(&mut self, host: &dyn BuildHost, path: &ResolvedPath) -> ProjectKey {
        if let Some(key) = self.keys.get(path) {
            return key.clone();
        }
        let key = canonical_key(path, host.use_case_sensitive_file_names());
        self.keys.insert(path.clone(), key.clone());
        key
    }

    /// Parse (or recall) the configuration at `path`.
    pub fn parse(&mut self, host: &dyn BuildHost, path: &ResolvedPath) -> ConfigEntry {
        let key = self.key_for(host, path);
        if let Some(entry) = self.entries.get(&key) {
            return entry.clone();
        }
        let entry = parse_project_config(host, path).map(Arc::new);
        self.entries.insert(key, entry.clone());
        entry
    }

    /// Recall an already-parsed entry without touching the file system.
    pub fn get(&self, key: &ProjectKey) -> Option<&ConfigEntry> {
        self.entries.get(key)
    }

    /// Drop the parse result for a project (`Full` reload); the next `parse`
    /// re-reads the file.
    pub fn evict(&mut self, key: &ProjectKey) {
        if self.entries.remove(key).is_some() {
            debug!(project = %key, "evicted cached config");
        }
    }

    /// Re-expand the input globs of a cached config (`Partial` reload).
    ///
    /// Input expansion happens during parse; re-parsing with warm file
    /// caches is equivalent to re-running only the glob walk, so a `Partial`
    /// reload is an evict-and-reparse that keeps the surrounding watch
    /// wiring untouched.
    pub fn reload_inputs(&mut self, host: &dyn BuildHost, path: &ResolvedPath) -> ConfigEntry {
        let key = self.key_for(host, path);
        self.entries.remove(&key);
        self.parse(host, path)
    }
}
