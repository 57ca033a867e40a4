// src/lib.rs

pub mod cli;
pub mod compile;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod host;
pub mod logging;
pub mod status;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::cli::CliArgs;
use crate::compile::SimpleProgramBuilder;
use crate::config::resolve_project_path;
use crate::engine::BuildState;
use crate::errors::Result;
use crate::host::{BuildHost, CachingHost, RealHost};
use crate::types::{ExitStatus, ResolvedPath};
use crate::watch::WatchMessage;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project root resolution
/// - host + scoped file cache + reference program builder
/// - the one-shot build (or clean)
/// - (optional) the watch orchestrator and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<ExitStatus> {
    let cwd = std::env::current_dir().context("determining current directory")?;

    let host: Arc<dyn BuildHost> = Arc::new(RealHost::new());
    let host = Arc::new(CachingHost::new(host));
    let builder = Arc::new(SimpleProgramBuilder::new());

    let roots: Vec<ResolvedPath> = if args.projects.is_empty() {
        vec![resolve_project_path(&cwd, Path::new("."))]
    } else {
        args.projects
            .iter()
            .map(|p| resolve_project_path(&cwd, Path::new(p)))
            .collect()
    };
    info!(roots = roots.len(), "resolved root projects");

    let options = args.build_options();
    let watch_mode = options.watch;
    let mut state = BuildState::new(host, builder, options, roots);

    if args.clean {
        return engine::clean(&mut state, None);
    }

    let exit = engine::build(&mut state, None, None)?;

    // Watchers are installed only after an error-free initial build; a
    // failed pass exits with its status instead.
    if watch_mode && exit == ExitStatus::Success {
        let watch_roots = watch::start_watching(&mut state);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<WatchMessage>();
        let _watcher_handle = watch::spawn_watcher(watch_roots, tx.clone())?;

        // Ctrl-C → graceful shutdown.
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(WatchMessage::Shutdown);
        });

        watch::run_watch(&mut state, rx, None).await?;
    }

    Ok(exit)
}
