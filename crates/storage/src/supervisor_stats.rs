// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor stats persistence.
//!
//! Written only by the supervisor daemon; the monitor reads it to merge
//! the scalars into its snapshot. Missing or corrupt files load as the
//! default so the daemons keep running.

use crate::atomic::{read_json, write_json_atomic, StorageError};
use oc_core::supervisor::SupervisorStats;
use std::path::Path;

pub fn load_supervisor_stats(path: &Path) -> SupervisorStats {
    match read_json(path) {
        Ok(Some(stats)) => stats,
        Ok(None) => SupervisorStats::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt supervisor stats, starting empty");
            SupervisorStats::default()
        }
    }
}

pub fn save_supervisor_stats(path: &Path, stats: &SupervisorStats) -> Result<(), StorageError> {
    write_json_atomic(path, stats)
}

#[cfg(test)]
#[path = "supervisor_stats_tests.rs"]
mod tests;
