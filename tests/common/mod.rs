#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tsbuild::compile::SimpleProgramBuilder;
use tsbuild::config::resolve_project_path;
use tsbuild::engine::{BuildOptions, BuildState};
use tsbuild::host::{BuildHost, CachingHost, MockHost};
use tsbuild::types::ResolvedPath;

/// Builder for one project directory inside a [`MockHost`]: a
/// `tsconfig.json` plus sources.
pub struct TestProject {
    dir: PathBuf,
    sources: Vec<(String, String)>,
    references: Vec<(String, bool)>,
    composite: bool,
    declaration: bool,
    incremental: bool,
    out_file: Option<String>,
    out_dir: Option<String>,
    include: Option<Vec<String>>,
    /// Emit an explicit `files` list; when false and `include` is also
    /// absent the project is a pure container.
    list_files: bool,
}

impl TestProject {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sources: Vec::new(),
            references: Vec::new(),
            composite: false,
            declaration: false,
            incremental: false,
            out_file: None,
            out_dir: None,
            include: None,
            list_files: true,
        }
    }

    pub fn source(mut self, name: &str, text: &str) -> Self {
        self.sources.push((name.to_string(), text.to_string()));
        self
    }

    pub fn reference(mut self, dir: &str) -> Self {
        self.references.push((dir.to_string(), false));
        self
    }

    pub fn prepend_reference(mut self, dir: &str) -> Self {
        self.references.push((dir.to_string(), true));
        self
    }

    pub fn composite(mut self) -> Self {
        self.composite = true;
        self
    }

    pub fn declaration(mut self) -> Self {
        self.declaration = true;
        self
    }

    pub fn incremental(mut self) -> Self {
        self.incremental = true;
        self
    }

    pub fn out_file(mut self, name: &str) -> Self {
        self.out_file = Some(name.to_string());
        self
    }

    pub fn out_dir(mut self, name: &str) -> Self {
        self.out_dir = Some(name.to_string());
        self
    }

    pub fn include(mut self, patterns: &[&str]) -> Self {
        self.include = Some(patterns.iter().map(|s| s.to_string()).collect());
        self.list_files = false;
        self
    }

    /// No `files`, no `include`: a pure reference aggregator.
    pub fn container(mut self) -> Self {
        self.list_files = false;
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("tsconfig.json")
    }

    /// Write the config and all sources into the host, stamped `at`.
    pub fn write(&self, host: &MockHost, at: SystemTime) {
        let mut compiler_options = serde_json::Map::new();
        if self.composite {
            compiler_options.insert("composite".into(), serde_json::Value::Bool(true));
        }
        if self.declaration {
            compiler_options.insert("declaration".into(), serde_json::Value::Bool(true));
        }
        if self.incremental {
            compiler_options.insert("incremental".into(), serde_json::Value::Bool(true));
        }
        if let Some(out_file) = &self.out_file {
            compiler_options.insert("outFile".into(), serde_json::Value::String(out_file.clone()));
        }
        if let Some(out_dir) = &self.out_dir {
            compiler_options.insert("outDir".into(), serde_json::Value::String(out_dir.clone()));
        }

        let mut config = serde_json::Map::new();
        config.insert(
            "compilerOptions".into(),
            serde_json::Value::Object(compiler_options),
        );
        if self.list_files {
            config.insert(
                "files".into(),
                serde_json::Value::Array(
                    self.sources
                        .iter()
                        .map(|(name, _)| serde_json::Value::String(name.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(include) = &self.include {
            config.insert(
                "include".into(),
                serde_json::Value::Array(
                    include
                        .iter()
                        .map(|p| serde_json::Value::String(p.clone()))
                        .collect(),
                ),
            );
        }
        if !self.references.is_empty() {
            config.insert(
                "references".into(),
                serde_json::Value::Array(
                    self.references
                        .iter()
                        .map(|(path, prepend)| {
                            let mut entry = serde_json::Map::new();
                            entry.insert(
                                "path".into(),
                                serde_json::Value::String(path.clone()),
                            );
                            if *prepend {
                                entry.insert("prepend".into(), serde_json::Value::Bool(true));
                            }
                            serde_json::Value::Object(entry)
                        })
                        .collect(),
                ),
            );
        }

        let text = serde_json::Value::Object(config).to_string();
        host.add_file_at(self.config_path(), text, at);
        for (name, source_text) in &self.sources {
            host.add_file_at(self.dir.join(name), source_text.clone(), at);
        }
    }
}

/// A fresh engine over a mock host, rooted at the given project dirs.
pub fn engine_for(mock: &MockHost, roots: &[&str]) -> BuildState {
    engine_with_options(mock, roots, BuildOptions::default())
}

pub fn engine_with_options(
    mock: &MockHost,
    roots: &[&str],
    options: BuildOptions,
) -> BuildState {
    let host: Arc<dyn BuildHost> = Arc::new(mock.clone());
    let host = Arc::new(CachingHost::new(host));
    let builder = Arc::new(SimpleProgramBuilder::new());
    let roots: Vec<ResolvedPath> = roots
        .iter()
        .map(|r| resolve_project_path(Path::new("/"), Path::new(r)))
        .collect();
    BuildState::new(host, builder, options, roots)
}

pub fn resolved(dir: &str) -> ResolvedPath {
    resolve_project_path(Path::new("/"), Path::new(dir))
}
