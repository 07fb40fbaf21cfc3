//! Tracing subscriber setup.
//!
//! The CLI subcommands log to stderr. The dashboard owns the terminal, so it
//! logs to a file instead.

use std::fs::{File, OpenOptions, create_dir_all};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr. Safe to call more than once; later calls are no-ops.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log to `path`, appending.
pub fn init_file(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create log dir '{}': {e}", parent.display())))?;
    }
    let file: File = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::io(format!("Failed to open log file '{}': {e}", path.display())))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
