// src/compile/build_info.rs

//! The persisted per-project build-info artifact.
//!
//! The schema belongs to the compiler; the engine reads only `version` for
//! its version gate. The reference builder records a content signature per
//! input and, for `outFile` projects, the bundle portion it contributed so
//! a bundle-only update can regenerate the concatenation without a program.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::host::BuildHost;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    /// Content signature (blake3 hex) per input file path.
    #[serde(default)]
    pub file_signatures: BTreeMap<String, String>,
    /// Present for `outFile` projects.
    #[serde(default)]
    pub bundle: Option<BundleInfo>,
}

/// What a bundle-only update needs: the text this project contributes and
/// the upstream bundle outputs that were prepended, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleInfo {
    pub js_text: String,
    /// Paths of prepended upstream `.js` bundle outputs.
    #[serde(default)]
    pub prepend_outputs: Vec<String>,
}

impl BuildInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            file_signatures: BTreeMap::new(),
            bundle: None,
        }
    }

    /// Load and fully deserialize a build-info artifact. `None` when the
    /// file is missing or does not parse.
    pub fn load(host: &dyn BuildHost, path: &Path) -> Option<BuildInfo> {
        let text = host.read_file(path)?;
        serde_json::from_str(&text).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Read only the `version` field of a build-info artifact, tolerating any
/// surrounding schema. `None` when unreadable.
pub fn read_version(host: &dyn BuildHost, path: &Path) -> Option<String> {
    let text = host.read_file(path)?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value.get("version")?.as_str().map(str::to_string)
}
