// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent session record and its mutable stats substructure.
//!
//! One `Session` per tracked agent. Records are created by the launcher,
//! mutated by the monitor daemon (stats, state tracking) and operator UIs,
//! and archived by explicit cleanup. Unknown JSON keys encountered on load
//! are kept in `extra` so newer files survive older binaries.

use crate::status::AgentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_FREQUENCY: u32 = 300;

/// Default priority assigned to new agents.
pub const DEFAULT_AGENT_VALUE: i64 = 1000;

/// Maximum recorded recent non-green durations.
pub const MAX_OPERATION_TIMES: usize = 20;

/// Coarse lifecycle of a session record.
///
/// `Terminated` is set when the terminal window disappears; `Done` when a
/// child reports completion. When both happen in the same tick, `Done` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLifecycle {
    #[default]
    Running,
    Terminated,
    Done,
}

/// Permission mode the agent runtime was launched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permissiveness {
    #[default]
    Normal,
    Permissive,
    Bypass,
}

impl std::str::FromStr for Permissiveness {
    type Err = crate::status::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Permissiveness::Normal),
            "permissive" => Ok(Permissiveness::Permissive),
            "bypass" => Ok(Permissiveness::Bypass),
            other => Err(crate::status::ParseStatusError(other.to_string())),
        }
    }
}

/// Mutable per-session statistics maintained by the daemons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub interaction_count: u64,
    /// Supervisor interventions. Incremented only from the supervisor log
    /// parser, never by direct sends.
    #[serde(default)]
    pub steers_count: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_tokens: u64,
    #[serde(default)]
    pub cache_read_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub estimated_cost_usd: f64,
    /// Recent non-green durations, newest last, bounded to
    /// [`MAX_OPERATION_TIMES`].
    #[serde(default)]
    pub operation_times: Vec<f64>,
    #[serde(default = "default_current_state")]
    pub current_state: AgentStatus,
    /// When `current_state` last changed.
    #[serde(default)]
    pub state_since: Option<DateTime<Utc>>,
    /// Wall-clock anchor of the last time accumulation.
    #[serde(default)]
    pub last_time_accumulation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub green_time_seconds: f64,
    #[serde(default)]
    pub non_green_time_seconds: f64,
    #[serde(default)]
    pub sleep_time_seconds: f64,
    #[serde(default = "default_current_task")]
    pub current_task: String,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

fn default_current_state() -> AgentStatus {
    AgentStatus::Running
}

fn default_current_task() -> String {
    "Initializing...".to_string()
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            interaction_count: 0,
            steers_count: 0,
            input_tokens: 0,
            output_tokens: 0,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            total_tokens: 0,
            estimated_cost_usd: 0.0,
            operation_times: Vec::new(),
            current_state: default_current_state(),
            state_since: None,
            last_time_accumulation: None,
            green_time_seconds: 0.0,
            non_green_time_seconds: 0.0,
            sleep_time_seconds: 0.0,
            current_task: default_current_task(),
            last_activity: None,
        }
    }
}

impl SessionStats {
    /// Record a non-green duration, keeping only the most recent entries.
    pub fn push_operation_time(&mut self, seconds: f64) {
        self.operation_times.push(seconds);
        if self.operation_times.len() > MAX_OPERATION_TIMES {
            let excess = self.operation_times.len() - MAX_OPERATION_TIMES;
            self.operation_times.drain(..excess);
        }
    }
}

/// Durable per-agent record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub tmux_session: String,
    pub tmux_window: u32,
    pub command: Vec<String>,
    #[serde(default)]
    pub start_directory: Option<PathBuf>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub status: SessionLifecycle,
    /// When the record was archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_session_id: Option<String>,
    #[serde(default)]
    pub permissiveness_mode: Permissiveness,
    #[serde(default)]
    pub standing_instructions: String,
    #[serde(default)]
    pub standing_orders_complete: bool,
    #[serde(default)]
    pub heartbeat_enabled: bool,
    #[serde(default)]
    pub heartbeat_paused: bool,
    #[serde(default = "default_heartbeat_frequency")]
    pub heartbeat_frequency_seconds: u32,
    #[serde(default)]
    pub heartbeat_instruction: String,
    #[serde(default)]
    pub last_heartbeat_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_asleep: bool,
    /// 0 means unlimited.
    #[serde(default)]
    pub cost_budget_usd: f64,
    #[serde(default = "default_agent_value")]
    pub agent_value: i64,
    #[serde(default)]
    pub human_annotation: String,
    #[serde(default)]
    pub time_context_enabled: bool,
    #[serde(default)]
    pub hook_status_detection: bool,
    /// Runtime session ids discovered in the agent runtime's own files,
    /// in discovery order.
    #[serde(default)]
    pub claude_session_ids: Vec<String>,
    #[serde(default)]
    pub stats: SessionStats,
    /// Unknown fields from newer writers, preserved across save/load.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_heartbeat_frequency() -> u32 {
    DEFAULT_HEARTBEAT_FREQUENCY
}

fn default_agent_value() -> i64 {
    DEFAULT_AGENT_VALUE
}

impl Session {
    pub fn new(
        name: impl Into<String>,
        tmux_session: impl Into<String>,
        tmux_window: u32,
        command: Vec<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            tmux_session: tmux_session.into(),
            tmux_window,
            command,
            start_directory: None,
            start_time,
            repo_name: None,
            branch: None,
            status: SessionLifecycle::Running,
            end_time: None,
            parent_session_id: None,
            permissiveness_mode: Permissiveness::Normal,
            standing_instructions: String::new(),
            standing_orders_complete: false,
            heartbeat_enabled: false,
            heartbeat_paused: false,
            heartbeat_frequency_seconds: DEFAULT_HEARTBEAT_FREQUENCY,
            heartbeat_instruction: String::new(),
            last_heartbeat_time: None,
            is_asleep: false,
            cost_budget_usd: 0.0,
            agent_value: DEFAULT_AGENT_VALUE,
            human_annotation: String::new(),
            time_context_enabled: false,
            hook_status_detection: false,
            claude_session_ids: Vec::new(),
            stats: SessionStats::default(),
            extra: serde_json::Map::new(),
        }
    }

    /// A root session has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_session_id.is_none()
    }

    pub fn uptime_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.start_time).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// True once the estimated spend reached a non-zero budget.
    pub fn budget_exceeded(&self) -> bool {
        self.cost_budget_usd > 0.0 && self.stats.estimated_cost_usd >= self.cost_budget_usd
    }

    /// Record a runtime session id. Returns false if it was already known.
    pub fn add_claude_session_id(&mut self, claude_session_id: &str) -> bool {
        if self.claude_session_ids.iter().any(|s| s == claude_session_id) {
            return false;
        }
        self.claude_session_ids.push(claude_session_id.to_string());
        true
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
