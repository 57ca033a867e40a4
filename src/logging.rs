// src/logging.rs

//! Logging initialisation.
//!
//! Status lines, build progress and diagnostics all flow through `tracing`
//! events; the subscriber configured here is their only sink. The effective
//! level is the first of: `--log-level`, the `TSBUILD_LOG` environment
//! variable, `info` — except that `--extended-diagnostics` raises the floor
//! to `debug` so the engine's per-project decisions (status evaluations,
//! queue movements, cache hits) become visible without a separate flag.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::{CliArgs, LogLevel};

/// Initialise the global subscriber from the parsed CLI arguments.
///
/// Call once at startup, before any engine work.
pub fn init_logging(args: &CliArgs) -> Result<()> {
    let level = resolve_level(args);

    let builder = fmt().with_max_level(level).with_target(false);
    if args.pretty {
        // Decorated multi-line output for humans staring at a watch session.
        builder.pretty().init();
    } else {
        // The default output doubles as machine-scrapeable build logs; keep
        // each event on one bare line.
        builder.without_time().init();
    }

    Ok(())
}

fn resolve_level(args: &CliArgs) -> Level {
    let requested = args
        .log_level
        .map(tracing_level)
        .or_else(|| {
            std::env::var("TSBUILD_LOG")
                .ok()
                .and_then(|value| value.trim().parse::<Level>().ok())
        })
        .unwrap_or(Level::INFO);

    // `Level` orders by verbosity: ERROR < WARN < INFO < DEBUG < TRACE.
    if args.extended_diagnostics && requested < Level::DEBUG {
        Level::DEBUG
    } else {
        requested
    }
}

fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}
