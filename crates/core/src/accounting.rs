// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure accounting primitives used by the monitor daemon.
//!
//! Everything here is side-effect free so the accumulation and cost logic
//! can be tested without a registry, a clock, or tmux.

use crate::snapshot::SessionView;
use crate::status::AgentStatus;
use chrono::{DateTime, Utc};

/// Accumulated time may exceed uptime by at most this factor before being
/// rescaled (clock skew between ticks makes small overshoots normal).
pub const UPTIME_CAP_TOLERANCE: f64 = 1.1;

/// Token counts parsed from the agent runtime's session files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub interaction_count: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.interaction_count += other.interaction_count;
    }
}

/// Per-million-token pricing used for cost estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        // Opus 4.5 list prices
        Self {
            input: 15.0,
            output: 75.0,
            cache_write: 18.75,
            cache_read: 1.50,
        }
    }
}

/// Estimate spend in USD for the given usage.
pub fn estimate_cost(usage: &TokenUsage, pricing: &Pricing) -> f64 {
    const PER_MILLION: f64 = 1_000_000.0;
    usage.input_tokens as f64 * pricing.input / PER_MILLION
        + usage.output_tokens as f64 * pricing.output / PER_MILLION
        + usage.cache_creation_tokens as f64 * pricing.cache_write / PER_MILLION
        + usage.cache_read_tokens as f64 * pricing.cache_read / PER_MILLION
}

/// Invariant: `total_tokens` is always the sum of the four counters.
pub fn total_tokens(input: u64, output: u64, cache_creation: u64, cache_read: u64) -> u64 {
    input + output + cache_creation + cache_read
}

/// Result of one time-accumulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAccumulation {
    pub green_seconds: f64,
    pub non_green_seconds: f64,
    pub sleep_seconds: f64,
    pub state_changed: bool,
    pub was_capped: bool,
}

/// The accumulation primitive: classify `elapsed` into green, non-green or
/// sleep based on the current status, then enforce the uptime cap.
///
/// - Zero or negative elapsed leaves the counters unchanged.
/// - `Asleep` adds to sleep only; `Terminated` adds nothing; green statuses
///   add to green; everything else adds to non-green.
/// - `previous_status == None` (first observation) never reports a state
///   change.
/// - When the three counters together exceed `uptime × 1.1` they are
///   rescaled proportionally down to the bound.
#[allow(clippy::too_many_arguments)]
pub fn accumulate_time(
    current_status: AgentStatus,
    previous_status: Option<AgentStatus>,
    elapsed_seconds: f64,
    current_green: f64,
    current_non_green: f64,
    current_sleep: f64,
    session_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> TimeAccumulation {
    let state_changed = previous_status.is_some_and(|prev| prev != current_status);

    let mut green = current_green;
    let mut non_green = current_non_green;
    let mut sleep = current_sleep;

    if elapsed_seconds > 0.0 {
        match current_status {
            AgentStatus::Asleep => sleep += elapsed_seconds,
            AgentStatus::Terminated => {}
            status if status.is_green() => green += elapsed_seconds,
            _ => non_green += elapsed_seconds,
        }
    }

    let mut was_capped = false;
    if let Some(start) = session_start {
        let uptime = (now - start).num_milliseconds().max(0) as f64 / 1000.0;
        let bound = uptime * UPTIME_CAP_TOLERANCE;
        let total = green + non_green + sleep;
        if total > bound && total > 0.0 {
            let factor = bound / total;
            green *= factor;
            non_green *= factor;
            sleep *= factor;
            was_capped = true;
        }
    }

    TimeAccumulation {
        green_seconds: green,
        non_green_seconds: non_green,
        sleep_seconds: sleep,
        state_changed,
        was_capped,
    }
}

/// Median of the given samples; 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Integer percentage of time spent green; 0 when no time recorded.
pub fn green_percentage(green_seconds: f64, non_green_seconds: f64) -> u32 {
    let total = green_seconds + non_green_seconds;
    if total <= 0.0 {
        return 0;
    }
    (green_seconds / total * 100.0).round() as u32
}

/// Fleet-wide aggregates for the snapshot. Asleep sessions are excluded
/// from every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FleetTotals {
    pub green_count: usize,
    pub total_green_seconds: f64,
    pub total_non_green_seconds: f64,
    pub active_count: usize,
}

pub fn aggregate_sessions(sessions: &[SessionView]) -> FleetTotals {
    let mut totals = FleetTotals::default();
    for view in sessions {
        if view.is_asleep {
            continue;
        }
        totals.active_count += 1;
        if view.current_status.is_green() {
            totals.green_count += 1;
        }
        totals.total_green_seconds += view.green_time_seconds;
        totals.total_non_green_seconds += view.non_green_time_seconds;
    }
    totals
}

/// True when a per-session sync is due (inclusive at the exact interval).
pub fn should_sync(
    last_sync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval_seconds: f64,
) -> bool {
    match last_sync {
        None => true,
        Some(last) => (now - last).num_milliseconds() as f64 / 1000.0 >= interval_seconds,
    }
}

#[cfg(test)]
#[path = "accounting_tests.rs"]
mod tests;
