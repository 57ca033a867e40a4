// src/host/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

pub mod cache;
pub mod mock;

pub use cache::CachingHost;
pub use mock::{HostOp, MockHost};

/// Modification time reported for files that do not exist.
///
/// Guaranteed earlier than any real timestamp so "missing" loses every
/// newer-than comparison.
pub fn missing_file_time() -> SystemTime {
    UNIX_EPOCH
}

/// Lower bound of the timestamp lattice.
pub fn minimum_time() -> SystemTime {
    UNIX_EPOCH
}

/// Upper bound of the timestamp lattice; used to mark "declaration content
/// definitely changed" so downstream bundles can never compare as fresh.
pub fn maximum_time() -> SystemTime {
    // 9999-12-31T23:59:59Z
    UNIX_EPOCH + Duration::from_secs(253_402_300_799)
}

/// Everything the engine needs from the environment: the file system and a
/// clock. The clock is part of the trait so tests can drive `set_modified_time`
/// stamping deterministically.
pub trait BuildHost: Send + Sync + Debug {
    /// Read a file as UTF-8 text. `None` when the file is missing or
    /// unreadable.
    fn read_file(&self, path: &Path) -> Option<String>;
    fn file_exists(&self, path: &Path) -> bool;
    fn directory_exists(&self, path: &Path) -> bool;
    fn create_directory(&self, path: &Path) -> Result<()>;
    /// Write a file, creating parent directories as needed.
    fn write_file(&self, path: &Path, text: &str) -> Result<()>;
    fn delete_file(&self, path: &Path) -> Result<()>;
    /// Modification time of a file, `None` when missing.
    fn modified_time(&self, path: &Path) -> Option<SystemTime>;
    fn set_modified_time(&self, path: &Path, time: SystemTime) -> Result<()>;
    /// All files under a directory, recursively.
    fn read_directory(&self, path: &Path) -> Vec<PathBuf>;
    fn now(&self) -> SystemTime;
    fn use_case_sensitive_file_names(&self) -> bool;
}

/// Implementation backed by `std::fs` and the wall clock.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

impl RealHost {
    pub fn new() -> Self {
        Self
    }

    fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                Self::walk(&path, out);
            } else {
                out.push(path);
            }
        }
    }
}

impl BuildHost for RealHost {
    fn read_file(&self, path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn write_file(&self, path: &Path, text: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file =
            fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("deleting file {:?}", path))
    }

    fn modified_time(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn set_modified_time(&self, path: &Path, time: SystemTime) -> Result<()> {
        let file = fs::File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("opening file {:?} to update its timestamp", path))?;
        file.set_times(fs::FileTimes::new().set_modified(time))
            .with_context(|| format!("updating timestamp of {:?}", path))
    }

    fn read_directory(&self, path: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        Self::walk(path, &mut out);
        out.sort();
        out
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        !cfg!(any(target_os = "windows", target_os = "macos"))
    }
}
