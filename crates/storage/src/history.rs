// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only CSV history logs.
//!
//! `agent_status_history.csv` records one row per observed status change;
//! `presence_log.csv` records one row per presence sample. Both carry a
//! fixed one-line header and are never rewritten.

use crate::atomic::StorageError;
use chrono::{DateTime, Utc};
use oc_core::status::AgentStatus;
use std::io::Write;
use std::path::Path;

const AGENT_HEADER: &str = "timestamp,agent,status,activity";
const PRESENCE_HEADER: &str = "timestamp,state";

/// One parsed row of the agent status history.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatusRow {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub status: AgentStatus,
    pub activity: String,
}

/// Append one status row, creating the file with its header first.
pub fn append_agent_status(
    path: &Path,
    timestamp: DateTime<Utc>,
    agent: &str,
    status: AgentStatus,
    activity: &str,
) -> Result<(), StorageError> {
    let row = format!(
        "{},{},{},{}\n",
        timestamp.to_rfc3339(),
        agent,
        status,
        escape_csv(activity)
    );
    append_with_header(path, AGENT_HEADER, &row)
}

/// Append one presence sample.
pub fn append_presence(
    path: &Path,
    timestamp: DateTime<Utc>,
    state: i32,
) -> Result<(), StorageError> {
    let row = format!("{},{}\n", timestamp.to_rfc3339(), state);
    append_with_header(path, PRESENCE_HEADER, &row)
}

/// Read the status history, optionally filtered by time and agent name.
/// Malformed rows are skipped.
pub fn read_agent_status_history(
    path: &Path,
    since: Option<DateTime<Utc>>,
    agent: Option<&str>,
) -> Vec<AgentStatusRow> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .skip(1) // header
        .filter_map(parse_row)
        .filter(|row| since.is_none_or(|since| row.timestamp >= since))
        .filter(|row| agent.is_none_or(|agent| row.agent == agent))
        .collect()
}

fn parse_row(line: &str) -> Option<AgentStatusRow> {
    let mut parts = line.splitn(4, ',');
    let timestamp = DateTime::parse_from_rfc3339(parts.next()?)
        .ok()?
        .with_timezone(&Utc);
    let agent = parts.next()?.to_string();
    let status = parts.next()?.parse().ok()?;
    let activity = unescape_csv(parts.next().unwrap_or_default());
    Some(AgentStatusRow {
        timestamp,
        agent,
        status,
        activity,
    })
}

fn append_with_header(path: &Path, header: &str, row: &str) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let fresh = !path.exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    if fresh {
        writeln!(file, "{header}").map_err(io_err)?;
    }
    file.write_all(row.as_bytes()).map_err(io_err)?;
    Ok(())
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn unescape_csv(field: &str) -> String {
    let trimmed = field.trim_end_matches(['\n', '\r']);
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
