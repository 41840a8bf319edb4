//! Logging setup.
//!
//! `RUST_LOG` wins over `logging.level` when it is set. Without it, the
//! chatty dependency targets are held at `warn` unless tracing is asked for.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::{Result, VaultError};

const NOISY_TARGETS: &[&str] = &["sqlx", "hyper", "tower_http"];

fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Filter directives for a configured level, e.g. `debug,sqlx=warn,...`.
fn filter_directives(level: &str) -> String {
    let level = normalize_level(level);
    if level == "trace" {
        return level.to_string();
    }
    std::iter::once(level.to_string())
        .chain(NOISY_TARGETS.iter().map(|target| format!("{target}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(level)))
}

/// Open the log file for appending, creating parent directories.
///
/// An empty path disables file logging.
fn open_log_file(path: &str) -> Result<Option<File>> {
    if path.trim().is_empty() {
        return Ok(None);
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Some(file))
}

/// Install the global subscriber: console always, plus the log file when
/// one is configured.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file_layer = open_log_file(&config.file)?.map(|file| {
        fmt::layer()
            .with_writer(Arc::new(file))
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| VaultError::Config(format!("failed to install log subscriber: {e}")))
}

/// Console-only logging, used when [`init`] fails.
pub fn init_console_only(level: &str) {
    let installed = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(fmt::layer().with_target(true))
        .try_init();

    if installed.is_err() {
        eprintln!("A log subscriber is already installed");
    }
}
