// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn usage_line(input: u64, output: u64, cache_creation: u64, cache_read: u64) -> String {
    serde_json::json!({
        "type": "assistant",
        "message": {
            "usage": {
                "input_tokens": input,
                "output_tokens": output,
                "cache_creation_input_tokens": cache_creation,
                "cache_read_input_tokens": cache_read,
            }
        }
    })
    .to_string()
}

fn write_transcript(dir: &Path, session_id: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(format!("{session_id}.jsonl"));
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

#[test]
fn munges_slashes_and_dots() {
    assert_eq!(
        munge_project_path(Path::new("/home/user/my.project")),
        "-home-user-my-project"
    );
}

#[test]
fn parse_usage_sums_all_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_transcript(
        dir.path(),
        "sess-a",
        &[
            usage_line(100, 50, 20, 10),
            "not json at all".to_string(),
            serde_json::json!({"type": "user", "message": {"role": "user"}}).to_string(),
            usage_line(5, 5, 0, 0),
        ],
    );

    let usage = parse_usage(&path).unwrap();
    assert_eq!(usage.input_tokens, 105);
    assert_eq!(usage.output_tokens, 55);
    assert_eq!(usage.cache_creation_tokens, 20);
    assert_eq!(usage.cache_read_tokens, 10);
    assert_eq!(usage.interaction_count, 2);
}

#[test]
fn parse_usage_missing_file_is_none() {
    assert_eq!(parse_usage(Path::new("/nonexistent/sess.jsonl")), None);
}

#[test]
fn list_session_files_newest_first() {
    let root = tempfile::tempdir().unwrap();
    let projects = ClaudeProjects::new(root.path());
    let project = Path::new("/tmp/proj");
    let dir = projects.project_dir(project);
    std::fs::create_dir_all(&dir).unwrap();

    write_transcript(&dir, "older", &[usage_line(1, 1, 0, 0)]);
    std::thread::sleep(std::time::Duration::from_millis(20));
    write_transcript(&dir, "newer", &[usage_line(1, 1, 0, 0)]);

    let files = projects.list_session_files(project);
    assert_eq!(files.len(), 2);
    assert!(files[0].to_string_lossy().contains("newer"));

    assert_eq!(projects.current_session_id(project).unwrap(), "newer");
}

#[test]
fn list_session_files_missing_project_is_empty() {
    let root = tempfile::tempdir().unwrap();
    let projects = ClaudeProjects::new(root.path());
    assert!(projects.list_session_files(Path::new("/no/such/dir")).is_empty());
    assert_eq!(projects.current_session_id(Path::new("/no/such/dir")), None);
}

#[test]
fn ignores_non_jsonl_files() {
    let root = tempfile::tempdir().unwrap();
    let projects = ClaudeProjects::new(root.path());
    let project = Path::new("/tmp/proj");
    let dir = projects.project_dir(project);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("notes.txt"), "not a transcript").unwrap();

    assert!(projects.list_session_files(project).is_empty());
}

#[test]
fn usage_for_sessions_sums_only_named_ids() {
    let root = tempfile::tempdir().unwrap();
    let projects = ClaudeProjects::new(root.path());
    let project = Path::new("/tmp/proj");
    let dir = projects.project_dir(project);
    std::fs::create_dir_all(&dir).unwrap();

    write_transcript(&dir, "sess-a", &[usage_line(100, 0, 0, 0)]);
    write_transcript(&dir, "sess-b", &[usage_line(50, 0, 0, 0)]);
    write_transcript(&dir, "sess-ignored", &[usage_line(999, 0, 0, 0)]);

    let usage = projects.usage_for_sessions(
        project,
        &["sess-a".to_string(), "sess-b".to_string(), "missing".to_string()],
    );
    assert_eq!(usage.input_tokens, 150);
}
