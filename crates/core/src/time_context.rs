// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Temporal context line injected into agent prompts.
//!
//! The hook handler emits one compact line on every prompt submission so an
//! agent keeps a sense of wall-clock time, operator presence, and its own
//! heartbeat cadence:
//!
//! ```text
//! Clock: 14:32 UTC | User: active | Uptime: 1h23m | Heartbeat: 15m (next: 7m)
//! ```

use crate::time_fmt::format_compact;
use chrono::{DateTime, Utc};

/// Inputs for one time-context line.
#[derive(Debug, Clone, Default)]
pub struct TimeContextInputs {
    /// Presence state from the monitor snapshot (1 locked, 2 inactive,
    /// 3 active).
    pub presence_state: Option<i32>,
    pub session_start: Option<DateTime<Utc>>,
    pub heartbeat_frequency_seconds: Option<u32>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

pub fn format_clock(now: DateTime<Utc>) -> String {
    now.format("%H:%M UTC").to_string()
}

pub fn format_presence(state: Option<i32>) -> &'static str {
    match state {
        Some(1) => "locked",
        Some(2) => "inactive",
        Some(3) => "active",
        _ => "unknown",
    }
}

/// Whether `hour` falls inside office hours, supporting a midnight wrap
/// (start 22, end 6 means 22:00–06:00).
pub fn in_office_hours(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= hour && hour < end
    } else {
        hour >= start || hour < end
    }
}

pub fn format_uptime(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    let start = start?;
    let seconds = (now - start).num_milliseconds() as f64 / 1000.0;
    Some(format_compact(seconds))
}

/// `"15m (next: 7m)"`, or `"15m (due now)"` once overdue.
pub fn format_heartbeat(
    frequency_seconds: Option<u32>,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<String> {
    let frequency = frequency_seconds?;
    let interval = format_compact(frequency as f64);
    let Some(last) = last else {
        return Some(format!("{interval} (due now)"));
    };
    let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
    let remaining = frequency as f64 - elapsed;
    if remaining <= 0.0 {
        Some(format!("{interval} (due now)"))
    } else {
        Some(format!("{interval} (next: {})", format_compact(remaining)))
    }
}

/// Assemble the full line. Sections without data are omitted.
pub fn generate_time_context(inputs: &TimeContextInputs, now: DateTime<Utc>) -> String {
    let mut parts = vec![
        format!("Clock: {}", format_clock(now)),
        format!("User: {}", format_presence(inputs.presence_state)),
    ];
    if let Some(uptime) = format_uptime(inputs.session_start, now) {
        parts.push(format!("Uptime: {uptime}"));
    }
    if let Some(heartbeat) = format_heartbeat(
        inputs.heartbeat_frequency_seconds,
        inputs.last_heartbeat,
        now,
    ) {
        parts.push(format!("Heartbeat: {heartbeat}"));
    }
    parts.join(" | ")
}

#[cfg(test)]
#[path = "time_context_tests.rs"]
mod tests;
