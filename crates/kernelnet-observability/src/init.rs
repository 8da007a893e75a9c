// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for kernelnet
//!
//! Console output always; with the `file-logging` feature and a log
//! directory, a timestamped run folder with a daily rotated combined log.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Number of run folders kept by default
pub const DEFAULT_RETENTION_RUNS: usize = 10;

/// Logging settings not carried by the debug flags
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Base level for every target not raised by a debug flag
    pub level: String,
    /// Base directory for run folders; `None` logs to the console only
    pub log_dir: Option<PathBuf>,
    /// Keep the N most recent run folders
    pub retention_runs: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            retention_runs: DEFAULT_RETENTION_RUNS,
        }
    }
}

/// Keeps file writers alive; logs are flushed when it is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Filter for the given flags and options
///
/// `RUST_LOG` wins over both when set.
pub fn build_filter(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(debug_flags.to_filter_string(&options.level)))
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails when the run folder cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let mut layers = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(debug_flags.any_enabled())
        .with_writer(std::io::stderr)
        .with_filter(build_filter(debug_flags, options))
        .boxed();
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guards, log_dir) = match &options.log_dir {
        Some(base) => {
            let (layer, guard, run_folder) = file_layer(base, debug_flags, options)?;
            layers.push(layer);
            (vec![guard], Some(run_folder))
        }
        None => (Vec::new(), None),
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir = {
        if options.log_dir.is_some() {
            eprintln!("Warning: log_dir ignored, built without the file-logging feature");
        }
        None
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logging subscriber: {}", e))?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
    })
}

#[cfg(feature = "file-logging")]
type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[cfg(feature = "file-logging")]
fn file_layer(
    base_log_dir: &Path,
    debug_flags: &CrateDebugFlags,
    options: &LoggingOptions,
) -> Result<(BoxedLayer, tracing_appender::non_blocking::WorkerGuard, PathBuf)> {
    use anyhow::Context;

    let run_folder = create_run_folder(base_log_dir)?;
    cleanup_old_logs(base_log_dir, options.retention_runs)
        .with_context(|| format!("Failed to clean up {}", base_log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&run_folder, "kernelnet.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(build_filter(debug_flags, options))
        .boxed();

    Ok((layer, guard, run_folder))
}

/// `run_YYYYmmdd_HHMMSS` under `base_log_dir`
#[cfg(feature = "file-logging")]
pub fn create_run_folder(base_log_dir: &Path) -> Result<PathBuf> {
    use anyhow::Context;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base_log_dir.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Remove all but the `retention_runs` most recent run folders
///
/// Folder names sort chronologically, so the name order is the age order.
#[cfg(feature = "file-logging")]
pub fn cleanup_old_logs(base_log_dir: &Path, retention_runs: usize) -> Result<()> {
    if !base_log_dir.exists() {
        return Ok(());
    }

    let mut runs: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        let is_run = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("run_"))
            .map(|stamp| {
                chrono::NaiveDateTime::parse_from_str(stamp, "%Y%m%d_%H%M%S").is_ok()
            })
            .unwrap_or(false);
        if path.is_dir() && is_run {
            runs.push(path);
        }
    }
    runs.sort();

    let excess = runs.len().saturating_sub(retention_runs);
    for path in runs.iter().take(excess) {
        if let Err(e) = std::fs::remove_dir_all(path) {
            eprintln!("Warning: Failed to remove old log directory {}: {}", path.display(), e);
        }
    }
    Ok(())
}
