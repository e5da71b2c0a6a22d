// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    write_json_atomic(&path, &json!({"a": 1, "b": [1, 2]})).unwrap();
    let loaded: serde_json::Value = read_json(&path).unwrap().unwrap();
    assert_eq!(loaded, json!({"a": 1, "b": [1, 2]}));
}

#[test]
fn output_is_pretty_with_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    write_json_atomic(&path, &json!({"key": "value"})).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.ends_with('\n'));
    assert!(raw.contains("  \"key\": \"value\""));
}

#[test]
fn no_tmp_file_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    write_json_atomic(&path, &json!({})).unwrap();
    assert!(!dir.path().join("state.json.tmp").exists());
}

#[test]
fn creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/state.json");

    write_json_atomic(&path, &json!(1)).unwrap();
    assert!(path.exists());
}

#[test]
fn missing_file_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let result: Option<serde_json::Value> =
        read_json(&dir.path().join("missing.json")).unwrap();
    assert_eq!(result, None);
}

#[test]
fn corrupt_file_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{not valid json").unwrap();

    let result: Result<Option<serde_json::Value>, _> = read_json(&path);
    assert!(matches!(result, Err(StorageError::Serialization { .. })));
}

#[test]
fn overwrite_replaces_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    write_json_atomic(&path, &json!({"version": 1})).unwrap();
    write_json_atomic(&path, &json!({"version": 2})).unwrap();

    let loaded: serde_json::Value = read_json(&path).unwrap().unwrap();
    assert_eq!(loaded["version"], 2);
}
