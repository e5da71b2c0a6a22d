// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat frequency parsing and compact duration formatting.

use thiserror::Error;

/// Heartbeat intervals below this are rejected.
pub const MIN_HEARTBEAT_FREQUENCY: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrequencyError {
    #[error("invalid frequency: {0}")]
    Invalid(String),
    #[error("heartbeat frequency {0}s is below the {MIN_HEARTBEAT_FREQUENCY}s minimum")]
    TooShort(u32),
}

/// Parse a heartbeat frequency: bare seconds (`"90"`) or `<N>s|m|h`
/// (`"90s"`, `"5m"`, `"1h"`). Enforces [`MIN_HEARTBEAT_FREQUENCY`].
pub fn parse_frequency(input: &str) -> Result<u32, FrequencyError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FrequencyError::Invalid(input.to_string()));
    }

    let (digits, multiplier) = match trimmed.chars().last() {
        Some('s') => (&trimmed[..trimmed.len() - 1], 1),
        Some('m') => (&trimmed[..trimmed.len() - 1], 60),
        Some('h') => (&trimmed[..trimmed.len() - 1], 3600),
        _ => (trimmed, 1),
    };

    let value: u32 = digits
        .parse()
        .map_err(|_| FrequencyError::Invalid(input.to_string()))?;
    let seconds = value
        .checked_mul(multiplier)
        .ok_or_else(|| FrequencyError::Invalid(input.to_string()))?;

    if seconds < MIN_HEARTBEAT_FREQUENCY {
        return Err(FrequencyError::TooShort(seconds));
    }
    Ok(seconds)
}

/// Format seconds as a compact duration: `"45m"`, `"1h23m"`, `"0m"`.
///
/// Used in the time-context line, so the format stays minute-granular.
pub fn format_compact(seconds: f64) -> String {
    if seconds < 0.0 {
        return "0m".to_string();
    }
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{hours}h{minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
