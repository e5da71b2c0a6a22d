// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified hook handler for the agent runtime's hook events.
//!
//! One command handles every registered hook event: it reads the event
//! JSON from stdin, writes the hook-state file the hook detector reads,
//! and for `UserPromptSubmit` prints the time-context line to stdout
//! (which the runtime injects into the prompt). Exits silently with 0
//! when the identity env vars or stdin are missing — a misconfigured
//! hook must never break the agent.

use chrono::Utc;
use oc_core::paths::{OvercodePaths, ENV_SESSION_NAME, ENV_TMUX_SESSION};
use oc_core::snapshot::MonitorSnapshot;
use oc_core::time_context::{generate_time_context, TimeContextInputs};
use oc_storage::read_json;
use std::io::Read;

pub fn run() -> i32 {
    let Ok(session_name) = std::env::var(ENV_SESSION_NAME) else {
        return 0;
    };
    let Ok(tmux_session) = std::env::var(ENV_TMUX_SESSION) else {
        return 0;
    };
    if session_name.is_empty() || tmux_session.is_empty() {
        return 0;
    }

    let mut stdin = String::new();
    if std::io::stdin().read_to_string(&mut stdin).is_err() || stdin.trim().is_empty() {
        return 0;
    }
    let Ok(data) = serde_json::from_str::<serde_json::Value>(&stdin) else {
        return 0;
    };
    let Some(event) = data.get("hook_event_name").and_then(|v| v.as_str()) else {
        return 0;
    };
    let tool_name = data.get("tool_name").and_then(|v| v.as_str());

    let paths = OvercodePaths::from_env();
    if write_hook_state(&paths, &tmux_session, &session_name, event, tool_name).is_err() {
        return 0;
    }

    if event == "UserPromptSubmit" {
        if let Some(line) = time_context_line(&paths, &tmux_session, &session_name) {
            println!("{line}");
        }
    }
    0
}

/// Write `hook_state_<name>.json` for the hook status detector.
fn write_hook_state(
    paths: &OvercodePaths,
    tmux_session: &str,
    session_name: &str,
    event: &str,
    tool_name: Option<&str>,
) -> std::io::Result<()> {
    paths.ensure_session_dir(tmux_session)?;

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let mut state = serde_json::json!({
        "event": event,
        "timestamp": timestamp,
    });
    if let Some(tool) = tool_name {
        state["tool_name"] = serde_json::json!(tool);
    }

    std::fs::write(
        paths.hook_state_file(tmux_session, session_name),
        state.to_string(),
    )
}

/// Assemble the time-context line from the published snapshot and the
/// session record. `None` when the session is unknown or opted out.
fn time_context_line(
    paths: &OvercodePaths,
    tmux_session: &str,
    session_name: &str,
) -> Option<String> {
    let registry = oc_storage::SessionRegistry::new(paths, tmux_session).ok()?;
    let session = registry.get_session_by_name(session_name)?;
    if !session.time_context_enabled {
        return None;
    }

    let presence_state = read_json::<MonitorSnapshot>(&paths.monitor_state_file(tmux_session))
        .ok()
        .flatten()
        .and_then(|snapshot| snapshot.presence_state);

    let inputs = TimeContextInputs {
        presence_state,
        session_start: Some(session.start_time),
        heartbeat_frequency_seconds: session
            .heartbeat_enabled
            .then_some(session.heartbeat_frequency_seconds),
        last_heartbeat: session.last_heartbeat_time,
    };
    Some(generate_time_context(&inputs, Utc::now()))
}

#[cfg(test)]
#[path = "hook_handler_tests.rs"]
mod tests;
