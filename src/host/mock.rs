// src/host/mock.rs

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};

use crate::host::BuildHost;

#[derive(Debug, Clone)]
struct MockFile {
    text: String,
    mtime: SystemTime,
}

/// Mutating operations performed through the host, in call order. Tests use
/// this to assert write-freedom (idempotent rebuilds, dry runs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    Write(PathBuf),
    Delete(PathBuf),
    SetModifiedTime(PathBuf),
}

#[derive(Debug)]
struct MockState {
    files: HashMap<PathBuf, MockFile>,
    dirs: HashSet<PathBuf>,
    now: SystemTime,
    ops: Vec<HostOp>,
}

/// In-memory host with a controllable clock.
///
/// Every file carries its own modification time; `add_file` stamps with the
/// current mock clock, `add_file_at` takes an explicit time. The clock only
/// moves when a test advances it.
#[derive(Debug, Clone)]
pub struct MockHost {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                files: HashMap::new(),
                dirs: HashSet::new(),
                now: UNIX_EPOCH + Duration::from_secs(1_000_000),
                ops: Vec::new(),
            })),
        }
    }

    /// Convenience: a timestamp `secs` seconds past the epoch.
    pub fn time(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        let now = self.state.lock().unwrap().now;
        self.add_file_at(path, text, now);
    }

    pub fn add_file_at(
        &self,
        path: impl Into<PathBuf>,
        text: impl Into<String>,
        mtime: SystemTime,
    ) {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        let mut parent = path.parent().map(Path::to_path_buf);
        while let Some(dir) = parent {
            if !state.dirs.insert(dir.clone()) {
                break;
            }
            parent = dir.parent().map(Path::to_path_buf);
        }
        state.files.insert(
            path,
            MockFile {
                text: text.into(),
                mtime,
            },
        );
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().files.remove(path.as_ref());
    }

    /// Update a file's modification time without going through the
    /// `BuildHost` surface (so no `HostOp` is recorded).
    pub fn touch(&self, path: impl AsRef<Path>, mtime: SystemTime) {
        if let Some(file) = self.state.lock().unwrap().files.get_mut(path.as_ref()) {
            file.mtime = mtime;
        }
    }

    pub fn mtime(&self, path: impl AsRef<Path>) -> Option<SystemTime> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path.as_ref())
            .map(|f| f.mtime)
    }

    pub fn file_text(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path.as_ref())
            .map(|f| f.text.clone())
    }

    pub fn set_now(&self, now: SystemTime) {
        self.state.lock().unwrap().now = now;
    }

    pub fn advance(&self, by: Duration) {
        self.state.lock().unwrap().now += by;
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }

    pub fn write_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter(|op| matches!(op, HostOp::Write(_)))
            .count()
    }
}

impl BuildHost for MockHost {
    fn read_file(&self, path: &Path) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| f.text.clone())
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.state.lock().unwrap().files.contains_key(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.dirs.contains(path) || state.files.keys().any(|f| f.starts_with(path))
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        self.state.lock().unwrap().dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn write_file(&self, path: &Path, text: &str) -> Result<()> {
        let now = {
            let mut state = self.state.lock().unwrap();
            state.ops.push(HostOp::Write(path.to_path_buf()));
            state.now
        };
        self.add_file_at(path, text, now);
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(HostOp::Delete(path.to_path_buf()));
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow!("file not found: {:?}", path))
    }

    fn modified_time(&self, path: &Path) -> Option<SystemTime> {
        self.state.lock().unwrap().files.get(path).map(|f| f.mtime)
    }

    fn set_modified_time(&self, path: &Path, time: SystemTime) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(HostOp::SetModifiedTime(path.to_path_buf()));
        match state.files.get_mut(path) {
            Some(file) => {
                file.mtime = time;
                Ok(())
            }
            None => Err(anyhow!("file not found: {:?}", path)),
        }
    }

    fn read_directory(&self, path: &Path) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        let mut files: Vec<PathBuf> = state
            .files
            .keys()
            .filter(|f| f.starts_with(path))
            .cloned()
            .collect();
        files.sort();
        files
    }

    fn now(&self) -> SystemTime {
        self.state.lock().unwrap().now
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        true
    }
}
