// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, minute, 0).unwrap()
}

#[test]
fn creates_file_with_exact_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent_status_history.csv");

    append_agent_status(&path, at(0), "alpha", AgentStatus::Running, "Active").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("timestamp,agent,status,activity\n"));
}

#[test]
fn appends_without_repeating_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");

    append_agent_status(&path, at(0), "alpha", AgentStatus::Running, "a").unwrap();
    append_agent_status(&path, at(1), "alpha", AgentStatus::WaitingUser, "b").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches("timestamp,agent").count(), 1);
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn read_round_trips_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");

    append_agent_status(&path, at(0), "alpha", AgentStatus::Running, "Working").unwrap();
    let rows = read_agent_status_history(&path, None, None);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].agent, "alpha");
    assert_eq!(rows[0].status, AgentStatus::Running);
    assert_eq!(rows[0].activity, "Working");
    assert_eq!(rows[0].timestamp, at(0));
}

#[test]
fn activity_with_commas_survives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");

    append_agent_status(
        &path,
        at(0),
        "alpha",
        AgentStatus::Running,
        "Reading a, b, and c",
    )
    .unwrap();
    let rows = read_agent_status_history(&path, None, None);
    assert_eq!(rows[0].activity, "Reading a, b, and c");
}

#[test]
fn filters_by_time_and_agent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");

    append_agent_status(&path, at(0), "alpha", AgentStatus::Running, "").unwrap();
    append_agent_status(&path, at(5), "beta", AgentStatus::WaitingUser, "").unwrap();
    append_agent_status(&path, at(10), "alpha", AgentStatus::WaitingUser, "").unwrap();

    let recent = read_agent_status_history(&path, Some(at(5)), None);
    assert_eq!(recent.len(), 2);

    let alpha_only = read_agent_status_history(&path, None, Some("alpha"));
    assert_eq!(alpha_only.len(), 2);
    assert!(alpha_only.iter().all(|r| r.agent == "alpha"));

    let both = read_agent_status_history(&path, Some(at(5)), Some("alpha"));
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].timestamp, at(10));
}

#[test]
fn missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_agent_status_history(&dir.path().join("none.csv"), None, None).is_empty());
}

#[test]
fn malformed_rows_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");
    std::fs::write(
        &path,
        "timestamp,agent,status,activity\nnot,a,valid,row\n2026-01-15T10:00:00+00:00,alpha,running,ok\n",
    )
    .unwrap();

    let rows = read_agent_status_history(&path, None, None);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].agent, "alpha");
}

#[test]
fn presence_log_has_exact_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("presence_log.csv");

    append_presence(&path, at(0), 3).unwrap();
    append_presence(&path, at(1), 2).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "timestamp,state");
    assert!(lines[1].ends_with(",3"));
    assert!(lines[2].ends_with(",2"));
}
