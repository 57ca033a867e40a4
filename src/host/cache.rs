// src/host/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use anyhow::Result;
use tracing::debug;

use crate::host::BuildHost;

/// Scoped read cache wrapping another [`BuildHost`].
///
/// While enabled, `read_file`, `file_exists` and `directory_exists` are
/// memoized; writes and deletes keep the memo coherent. The cache is enabled
/// for the duration of a `build()` call and, in watch mode, between events.
///
/// `enable_cache` is idempotent (it clears any previous scope first);
/// `disable_cache` drops every memoized entry and restores pass-through
/// behaviour.
#[derive(Debug)]
pub struct CachingHost {
    inner: Arc<dyn BuildHost>,
    enabled: AtomicBool,
    file_texts: Mutex<HashMap<PathBuf, Option<String>>>,
    file_exists: Mutex<HashMap<PathBuf, bool>>,
    dir_exists: Mutex<HashMap<PathBuf, bool>>,
}

impl CachingHost {
    pub fn new(inner: Arc<dyn BuildHost>) -> Self {
        Self {
            inner,
            enabled: AtomicBool::new(false),
            file_texts: Mutex::new(HashMap::new()),
            file_exists: Mutex::new(HashMap::new()),
            dir_exists: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &Arc<dyn BuildHost> {
        &self.inner
    }

    pub fn enable_cache(&self) {
        self.clear();
        self.enabled.store(true, Ordering::SeqCst);
        debug!("file content cache enabled");
    }

    pub fn disable_cache(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.clear();
        debug!("file content cache disabled");
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.file_texts.lock().unwrap().clear();
        self.file_exists.lock().unwrap().clear();
        self.dir_exists.lock().unwrap().clear();
    }

    /// Drop memoized entries for one path; used by the watch orchestrator
    /// when the file changed outside the engine.
    pub fn invalidate(&self, path: &Path) {
        self.file_texts.lock().unwrap().remove(path);
        self.file_exists.lock().unwrap().remove(path);
    }
}

impl BuildHost for CachingHost {
    fn read_file(&self, path: &Path) -> Option<String> {
        if !self.is_enabled() {
            return self.inner.read_file(path);
        }
        if let Some(text) = self.file_texts.lock().unwrap().get(path) {
            return text.clone();
        }
        let text = self.inner.read_file(path);
        self.file_texts
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), text.clone());
        text
    }

    fn file_exists(&self, path: &Path) -> bool {
        if !self.is_enabled() {
            return self.inner.file_exists(path);
        }
        if let Some(exists) = self.file_exists.lock().unwrap().get(path) {
            return *exists;
        }
        let exists = self.inner.file_exists(path);
        self.file_exists
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), exists);
        exists
    }

    fn directory_exists(&self, path: &Path) -> bool {
        if !self.is_enabled() {
            return self.inner.directory_exists(path);
        }
        if let Some(exists) = self.dir_exists.lock().unwrap().get(path) {
            return *exists;
        }
        let exists = self.inner.directory_exists(path);
        self.dir_exists
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), exists);
        exists
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        self.dir_exists.lock().unwrap().remove(path);
        self.inner.create_directory(path)
    }

    fn write_file(&self, path: &Path, text: &str) -> Result<()> {
        self.inner.write_file(path, text)?;
        if self.is_enabled() {
            self.file_texts
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), Some(text.to_string()));
            self.file_exists
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), true);
        }
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        self.invalidate(path);
        self.inner.delete_file(path)
    }

    fn modified_time(&self, path: &Path) -> Option<SystemTime> {
        self.inner.modified_time(path)
    }

    fn set_modified_time(&self, path: &Path, time: SystemTime) -> Result<()> {
        self.inner.set_modified_time(path, time)
    }

    fn read_directory(&self, path: &Path) -> Vec<PathBuf> {
        self.inner.read_directory(path)
    }

    fn now(&self) -> SystemTime {
        self.inner.now()
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.inner.use_case_sensitive_file_names()
    }
}
