// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log file setup with startup rotation.

use std::path::Path;
use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log path has no parent directory")]
    NoParent,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Rotate the log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `x.log` → `x.log.1` → `x.log.2` → `x.log.3`, deleting the
/// oldest. Best-effort: rotation failures never stop a daemon from
/// starting.
pub fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Install a non-blocking file subscriber writing to `log_path`.
///
/// Returns the worker guard that must be held until process exit.
pub fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LoggingError> {
    let parent = log_path.parent().ok_or(LoggingError::NoParent)?;
    std::fs::create_dir_all(parent)?;

    let file_name = log_path.file_name().ok_or(LoggingError::NoParent)?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
