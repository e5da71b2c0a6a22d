// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID file management for the daemons.
//!
//! Single-instance enforcement uses an `fs2` exclusive lock on the pid
//! file held for the process lifetime; liveness checks read the recorded
//! pid and look it up in `/proc`.

use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write our pid and take the exclusive lock. The returned handle must be
/// kept alive for the daemon's lifetime; `None` when another instance
/// already holds the lock.
pub fn acquire(path: &Path) -> std::io::Result<Option<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;
    Ok(Some(file))
}

/// The pid recorded in the file, if parseable.
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether the recorded pid names a live process.
pub fn is_running(path: &Path) -> bool {
    match read_pid(path) {
        Some(pid) => Path::new(&format!("/proc/{pid}")).exists(),
        None => false,
    }
}

/// Signal the recorded process to terminate. Returns false when no live
/// process was found. The pid file is removed either way.
pub fn stop(path: &Path) -> bool {
    let stopped = match read_pid(path) {
        Some(pid) if Path::new(&format!("/proc/{pid}")).exists() => {
            std::process::Command::new("kill")
                .arg(pid.to_string())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        }
        _ => false,
    };
    let _ = std::fs::remove_file(path);
    stopped
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
