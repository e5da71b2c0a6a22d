// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code session-file scanning
//!
//! The agent runtime writes one JSONL transcript per session under
//! `~/.claude/projects/<munged-project-path>/<session-id>.jsonl`. The
//! monitor and supervisor daemons read those files (never write them) to
//! attribute token usage to tracked agents.

use oc_core::accounting::TokenUsage;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Handle on the runtime's per-project transcript tree.
#[derive(Debug, Clone)]
pub struct ClaudeProjects {
    root: PathBuf,
}

impl ClaudeProjects {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default `~/.claude/projects` location.
    pub fn from_home() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".claude").join("projects"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding transcripts for a project path. The runtime munges
    /// the absolute path by replacing `/` and `.` with `-`.
    pub fn project_dir(&self, start_directory: &Path) -> PathBuf {
        self.root.join(munge_project_path(start_directory))
    }

    /// Transcript files for a project, newest first. Empty when the project
    /// directory does not exist.
    pub fn list_session_files(&self, start_directory: &Path) -> Vec<PathBuf> {
        let dir = self.project_dir(start_directory);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut files: Vec<(std::time::SystemTime, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "jsonl") {
                    let modified = entry.metadata().ok()?.modified().ok()?;
                    Some((modified, path))
                } else {
                    None
                }
            })
            .collect();
        files.sort_by(|a, b| b.0.cmp(&a.0));
        files.into_iter().map(|(_, path)| path).collect()
    }

    /// Session id (file stem) of the most recently modified transcript.
    pub fn current_session_id(&self, start_directory: &Path) -> Option<String> {
        self.list_session_files(start_directory)
            .first()
            .and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().to_string())
    }

    pub fn session_file(&self, start_directory: &Path, session_id: &str) -> PathBuf {
        self.project_dir(start_directory)
            .join(format!("{session_id}.jsonl"))
    }

    /// Sum usage across the given session ids for one project.
    pub fn usage_for_sessions(&self, start_directory: &Path, session_ids: &[String]) -> TokenUsage {
        let mut total = TokenUsage::default();
        for id in session_ids {
            if let Some(usage) = parse_usage(&self.session_file(start_directory, id)) {
                total.add(&usage);
            }
        }
        total
    }
}

/// Munge an absolute project path into the runtime's directory name.
pub fn munge_project_path(path: &Path) -> String {
    path.display()
        .to_string()
        .chars()
        .map(|c| if c == '/' || c == '.' { '-' } else { c })
        .collect()
}

/// Parse token usage out of one transcript. Returns `None` when the file is
/// unreadable; individual malformed lines are skipped.
pub fn parse_usage(file: &Path) -> Option<TokenUsage> {
    let reader = BufReader::new(File::open(file).ok()?);
    let mut usage = TokenUsage::default();

    for line in reader.lines() {
        let Ok(line) = line else { break };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        let Some(message_usage) = value.get("message").and_then(|m| m.get("usage")) else {
            continue;
        };
        usage.input_tokens += count(message_usage, "input_tokens");
        usage.output_tokens += count(message_usage, "output_tokens");
        usage.cache_creation_tokens += count(message_usage, "cache_creation_input_tokens");
        usage.cache_read_tokens += count(message_usage, "cache_read_input_tokens");
        usage.interaction_count += 1;
    }

    Some(usage)
}

fn count(usage: &serde_json::Value, key: &str) -> u64 {
    usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
