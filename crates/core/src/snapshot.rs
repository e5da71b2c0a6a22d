// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The snapshot the monitor daemon publishes once per tick.
//!
//! `MonitorSnapshot` is the one-way hand-off from the monitor to every
//! consumer: the supervisor daemon, the TUI, the web dashboard, and the
//! relay. Each `SessionView` is a flat projection suitable for direct
//! rendering.

use crate::accounting::FleetTotals;
use crate::session::{Session, SessionLifecycle};
use crate::status::AgentStatus;
use crate::supervisor::SupervisorStats;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the most recent relay push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Ok,
    Error,
    #[default]
    Disabled,
}

/// One OS presence sample: state 1 = locked, 2 = inactive, 3 = active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresenceSample {
    pub state: i32,
    pub idle_seconds: f64,
}

/// Flat per-session projection inside the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub name: String,
    pub tmux_session: String,
    pub tmux_window: u32,
    pub lifecycle: SessionLifecycle,
    pub current_status: AgentStatus,
    pub current_activity: String,
    pub is_asleep: bool,
    pub standing_instructions: String,
    pub repo_name: Option<String>,
    pub branch: Option<String>,
    pub green_time_seconds: f64,
    pub non_green_time_seconds: f64,
    pub sleep_time_seconds: f64,
    pub uptime_seconds: f64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
    pub cost_budget_usd: f64,
    pub budget_exceeded: bool,
    pub agent_value: i64,
    pub steers_count: u64,
    pub interaction_count: u64,
    pub heartbeat_enabled: bool,
    pub heartbeat_paused: bool,
    pub heartbeat_frequency_seconds: u32,
    pub last_heartbeat_time: Option<DateTime<Utc>>,
    pub human_annotation: String,
    pub last_activity: Option<DateTime<Utc>>,
}

impl SessionView {
    /// Project a session record plus the status the detector just assigned.
    pub fn project(
        session: &Session,
        status: AgentStatus,
        activity: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: session.id.clone(),
            name: session.name.clone(),
            tmux_session: session.tmux_session.clone(),
            tmux_window: session.tmux_window,
            lifecycle: session.status,
            current_status: status,
            current_activity: activity.into(),
            is_asleep: session.is_asleep,
            standing_instructions: session.standing_instructions.clone(),
            repo_name: session.repo_name.clone(),
            branch: session.branch.clone(),
            green_time_seconds: session.stats.green_time_seconds,
            non_green_time_seconds: session.stats.non_green_time_seconds,
            sleep_time_seconds: session.stats.sleep_time_seconds,
            uptime_seconds: session.uptime_seconds(now),
            total_tokens: session.stats.total_tokens,
            estimated_cost_usd: session.stats.estimated_cost_usd,
            cost_budget_usd: session.cost_budget_usd,
            budget_exceeded: session.budget_exceeded(),
            agent_value: session.agent_value,
            steers_count: session.stats.steers_count,
            interaction_count: session.stats.interaction_count,
            heartbeat_enabled: session.heartbeat_enabled,
            heartbeat_paused: session.heartbeat_paused,
            heartbeat_frequency_seconds: session.heartbeat_frequency_seconds,
            last_heartbeat_time: session.last_heartbeat_time,
            human_annotation: session.human_annotation.clone(),
            last_activity: session.stats.last_activity,
        }
    }

    /// A blank view. Handy as a starting point in tests and aggregation.
    pub fn empty() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            tmux_session: String::new(),
            tmux_window: 0,
            lifecycle: SessionLifecycle::Running,
            current_status: AgentStatus::Running,
            current_activity: String::new(),
            is_asleep: false,
            standing_instructions: String::new(),
            repo_name: None,
            branch: None,
            green_time_seconds: 0.0,
            non_green_time_seconds: 0.0,
            sleep_time_seconds: 0.0,
            uptime_seconds: 0.0,
            total_tokens: 0,
            estimated_cost_usd: 0.0,
            cost_budget_usd: 0.0,
            budget_exceeded: false,
            agent_value: 0,
            steers_count: 0,
            interaction_count: 0,
            heartbeat_enabled: false,
            heartbeat_paused: false,
            heartbeat_frequency_seconds: 0,
            last_heartbeat_time: None,
            human_annotation: String::new(),
            last_activity: None,
        }
    }
}

/// Published once per monitor tick to `monitor_daemon_state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub pid: u32,
    pub status: String,
    pub loop_count: u64,
    pub last_loop_time: DateTime<Utc>,
    pub current_interval: f64,
    #[serde(default)]
    pub presence_state: Option<i32>,
    #[serde(default)]
    pub presence_idle_seconds: Option<f64>,
    #[serde(default)]
    pub presence_available: bool,
    #[serde(default)]
    pub relay_enabled: bool,
    #[serde(default)]
    pub relay_last_push: Option<DateTime<Utc>>,
    #[serde(default)]
    pub relay_last_status: RelayState,
    #[serde(default)]
    pub supervisor_launches: u64,
    #[serde(default)]
    pub supervisor_total_tokens: u64,
    #[serde(default)]
    pub supervisor_claude_running: bool,
    #[serde(default)]
    pub supervisor_claude_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub supervisor_claude_total_run_seconds: f64,
    #[serde(default)]
    pub green_count: usize,
    #[serde(default)]
    pub total_green_seconds: f64,
    #[serde(default)]
    pub total_non_green_seconds: f64,
    #[serde(default)]
    pub active_count: usize,
    #[serde(default)]
    pub sessions: Vec<SessionView>,
}

impl MonitorSnapshot {
    pub fn new(pid: u32, interval_seconds: f64, now: DateTime<Utc>) -> Self {
        Self {
            pid,
            status: "running".to_string(),
            loop_count: 0,
            last_loop_time: now,
            current_interval: interval_seconds,
            presence_state: None,
            presence_idle_seconds: None,
            presence_available: false,
            relay_enabled: false,
            relay_last_push: None,
            relay_last_status: RelayState::Disabled,
            supervisor_launches: 0,
            supervisor_total_tokens: 0,
            supervisor_claude_running: false,
            supervisor_claude_started_at: None,
            supervisor_claude_total_run_seconds: 0.0,
            green_count: 0,
            total_green_seconds: 0.0,
            total_non_green_seconds: 0.0,
            active_count: 0,
            sessions: Vec::new(),
        }
    }

    /// True when the monitor has not ticked within `max_age_seconds`.
    pub fn is_stale(&self, max_age_seconds: i64, now: DateTime<Utc>) -> bool {
        now - self.last_loop_time > Duration::seconds(max_age_seconds)
    }

    pub fn set_totals(&mut self, totals: FleetTotals) {
        self.green_count = totals.green_count;
        self.total_green_seconds = totals.total_green_seconds;
        self.total_non_green_seconds = totals.total_non_green_seconds;
        self.active_count = totals.active_count;
    }

    /// Merge the supervisor daemon's scalars into this snapshot.
    pub fn merge_supervisor(&mut self, stats: &SupervisorStats) {
        self.supervisor_launches = stats.supervisor_launches;
        self.supervisor_total_tokens = stats.supervisor_total_tokens;
        self.supervisor_claude_running = stats.supervisor_claude_running;
        self.supervisor_claude_started_at = stats.supervisor_claude_started_at;
        self.supervisor_claude_total_run_seconds = stats.supervisor_claude_total_run_seconds;
    }

    pub fn set_presence(&mut self, sample: Option<PresenceSample>) {
        match sample {
            Some(sample) => {
                self.presence_state = Some(sample.state);
                self.presence_idle_seconds = Some(sample.idle_seconds);
                self.presence_available = true;
            }
            None => {
                self.presence_state = None;
                self.presence_idle_seconds = None;
                self.presence_available = false;
            }
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
