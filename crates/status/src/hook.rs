// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook-event status detector.
//!
//! The runtime's hook handler writes `hook_state_<name>.json` on every
//! hook event. A fresh file maps directly to a status; anything missing,
//! malformed or older than the freshness window delegates to the polling
//! detector. Last-writer-wins on the file is intentional — one producer,
//! many readers, no locking.

use crate::detector::{Detection, StatusDetector, PANE_CAPTURE_LINES};
use crate::polling::{shell_prompt_visible, PollingDetector};
use async_trait::async_trait;
use oc_adapters::TmuxAdapter;
use oc_core::session::Session;
use oc_core::status::AgentStatus;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hook files older than this are ignored (crash protection).
pub const DEFAULT_STALE_THRESHOLD_SECONDS: f64 = 120.0;

/// A fresh hook event; staleness is filtered out at parse time.
#[derive(Debug, Clone, PartialEq)]
struct HookState {
    event: String,
    tool_name: Option<String>,
}

/// Hook detector wrapping a polling fallback.
pub struct HookDetector<T: TmuxAdapter> {
    state_dir: PathBuf,
    stale_threshold_seconds: f64,
    polling: PollingDetector<T>,
}

impl<T: TmuxAdapter> HookDetector<T> {
    /// `state_dir` is the per-tmux-session directory holding the
    /// `hook_state_<name>.json` files.
    pub fn new(tmux_session: impl Into<String>, tmux: T, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            stale_threshold_seconds: DEFAULT_STALE_THRESHOLD_SECONDS,
            polling: PollingDetector::new(tmux_session, tmux),
        }
    }

    pub fn with_stale_threshold(mut self, seconds: f64) -> Self {
        self.stale_threshold_seconds = seconds;
        self
    }

    /// Parse and freshness-check the hook state file. `None` on any
    /// problem — the caller falls back to polling.
    fn read_hook_state(&self, session_name: &str) -> Option<HookState> {
        let path = self.state_dir.join(format!("hook_state_{session_name}.json"));
        let content = std::fs::read_to_string(path).ok()?;
        let value: serde_json::Value = serde_json::from_str(&content).ok()?;
        let object = value.as_object()?;

        let event = object.get("event")?.as_str()?.to_string();
        let timestamp = object.get("timestamp")?.as_f64()?;
        let tool_name = object
            .get("tool_name")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        if now - timestamp > self.stale_threshold_seconds {
            return None;
        }

        Some(HookState { event, tool_name })
    }

    fn map_event(&self, state: &HookState, session: &Session, pane: &str) -> Detection {
        match state.event.as_str() {
            "UserPromptSubmit" => {
                Detection::new(AgentStatus::Running, "Processing prompt", pane)
            }
            "PostToolUse" => {
                let activity = match state.tool_name {
                    Some(ref tool) => format!("Using {tool}"),
                    None => "Using tool".to_string(),
                };
                Detection::new(AgentStatus::Running, activity, pane)
            }
            "Stop" => {
                if session.is_root() {
                    Detection::new(AgentStatus::WaitingUser, "Waiting for user input", pane)
                } else {
                    Detection::new(
                        AgentStatus::WaitingOversight,
                        "Waiting for oversight report",
                        pane,
                    )
                }
            }
            "PermissionRequest" => Detection::new(
                AgentStatus::WaitingUser,
                "Permission: approval required",
                pane,
            ),
            "SessionEnd" => {
                // A shell prompt means the agent really exited; a Claude
                // prompt means /clear and the agent is still there.
                if shell_prompt_visible(pane) {
                    Detection::new(AgentStatus::Terminated, "Session ended", pane)
                } else {
                    Detection::new(AgentStatus::WaitingUser, "Waiting for user input", pane)
                }
            }
            other => {
                tracing::debug!(event = other, "unknown hook event, treating as waiting");
                Detection::new(AgentStatus::WaitingUser, "Waiting for user input", pane)
            }
        }
    }
}

#[async_trait]
impl<T: TmuxAdapter> StatusDetector for HookDetector<T> {
    async fn detect(&self, session: &Session) -> Detection {
        let Some(state) = self.read_hook_state(&session.name) else {
            return self.polling.detect(session).await;
        };

        let pane = self
            .polling
            .pane_content(session.tmux_window, PANE_CAPTURE_LINES)
            .await
            .unwrap_or_default();

        self.map_event(&state, session, &pane)
    }

    async fn pane_content(&self, window: u32, lines: u32) -> Option<String> {
        self.polling.pane_content(window, lines).await
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
