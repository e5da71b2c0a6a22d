// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor daemon statistics.
//!
//! Persisted to `supervisor_stats.json`, written only by the supervisor
//! daemon and read by the monitor for snapshot merging. `seen_session_ids`
//! makes token accumulation idempotent across ticks.

use crate::accounting::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupervisorStats {
    #[serde(default)]
    pub supervisor_launches: u64,
    #[serde(default)]
    pub supervisor_input_tokens: u64,
    #[serde(default)]
    pub supervisor_output_tokens: u64,
    #[serde(default)]
    pub supervisor_cache_tokens: u64,
    #[serde(default)]
    pub supervisor_total_tokens: u64,
    #[serde(default)]
    pub seen_session_ids: Vec<String>,
    #[serde(default)]
    pub supervisor_claude_running: bool,
    #[serde(default)]
    pub supervisor_claude_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub supervisor_claude_total_run_seconds: f64,
}

impl SupervisorStats {
    /// Add one runtime session's usage. Returns false (and changes nothing)
    /// when the session id was already tallied.
    pub fn add_usage(&mut self, session_id: &str, usage: &TokenUsage) -> bool {
        if self.seen_session_ids.iter().any(|s| s == session_id) {
            return false;
        }
        self.seen_session_ids.push(session_id.to_string());
        self.supervisor_input_tokens += usage.input_tokens;
        self.supervisor_output_tokens += usage.output_tokens;
        self.supervisor_cache_tokens += usage.cache_creation_tokens + usage.cache_read_tokens;
        self.supervisor_total_tokens += usage.total();
        true
    }

    /// Record a worker launch.
    pub fn record_launch(&mut self, started_at: DateTime<Utc>) {
        self.supervisor_launches += 1;
        self.supervisor_claude_running = true;
        self.supervisor_claude_started_at = Some(started_at);
    }

    /// Record the worker stopping, folding its run time into the cumulative
    /// counter. No-op when no worker was running.
    pub fn record_stopped(&mut self, now: DateTime<Utc>) {
        if !self.supervisor_claude_running {
            return;
        }
        if let Some(started) = self.supervisor_claude_started_at {
            let ran = (now - started).num_milliseconds().max(0) as f64 / 1000.0;
            self.supervisor_claude_total_run_seconds += ran;
        }
        self.supervisor_claude_running = false;
        self.supervisor_claude_started_at = None;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
