// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime agent status classification.
//!
//! Distinct from [`crate::session::SessionLifecycle`]: the lifecycle is the
//! coarse persistent record state, while `AgentStatus` is what the detectors
//! infer from the terminal on every monitor tick.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status assigned to a tracked agent on each monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Agent is actively working (processing, running tools, or on-task idle)
    Running,
    /// Agent is waiting for human input (empty prompt, permission, stalled)
    WaitingUser,
    /// Child agent finished a turn and is waiting for its parent's report
    WaitingOversight,
    /// Agent is waiting for an approval decision
    WaitingApproval,
    /// Agent is idle between heartbeats
    WaitingHeartbeat,
    /// Agent is idle with no standing instructions configured
    NoInstructions,
    /// Agent surfaced an error in its terminal
    Error,
    /// The agent process exited (shell prompt visible)
    Terminated,
    /// A heartbeat was just delivered
    HeartbeatStart,
    /// Operator froze the agent
    Asleep,
}

impl AgentStatus {
    /// Green statuses are the ones presumed productive.
    pub fn is_green(self) -> bool {
        matches!(self, AgentStatus::Running | AgentStatus::HeartbeatStart)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Running => "running",
            AgentStatus::WaitingUser => "waiting_user",
            AgentStatus::WaitingOversight => "waiting_oversight",
            AgentStatus::WaitingApproval => "waiting_approval",
            AgentStatus::WaitingHeartbeat => "waiting_heartbeat",
            AgentStatus::NoInstructions => "no_instructions",
            AgentStatus::Error => "error",
            AgentStatus::Terminated => "terminated",
            AgentStatus::HeartbeatStart => "heartbeat_start",
            AgentStatus::Asleep => "asleep",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown status strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for AgentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(AgentStatus::Running),
            "waiting_user" => Ok(AgentStatus::WaitingUser),
            "waiting_oversight" => Ok(AgentStatus::WaitingOversight),
            "waiting_approval" => Ok(AgentStatus::WaitingApproval),
            "waiting_heartbeat" => Ok(AgentStatus::WaitingHeartbeat),
            "no_instructions" => Ok(AgentStatus::NoInstructions),
            "error" => Ok(AgentStatus::Error),
            "terminated" => Ok(AgentStatus::Terminated),
            "heartbeat_start" => Ok(AgentStatus::HeartbeatStart),
            "asleep" => Ok(AgentStatus::Asleep),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
