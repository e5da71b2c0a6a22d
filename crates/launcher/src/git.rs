// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repo/branch detection for launched sessions.
//!
//! Reads `.git/HEAD` directly instead of shelling out; a missing or
//! unusual repo just leaves the fields unset.

use std::path::Path;

/// `(repo_name, branch)` for a working directory, walking up to the
/// enclosing repository root.
pub(crate) fn detect_repo(start_directory: &Path) -> (Option<String>, Option<String>) {
    let mut dir = Some(start_directory);
    while let Some(current) = dir {
        let head = current.join(".git").join("HEAD");
        if head.is_file() {
            let repo = current
                .file_name()
                .map(|name| name.to_string_lossy().to_string());
            let branch = std::fs::read_to_string(&head)
                .ok()
                .and_then(|content| parse_head_branch(&content));
            return (repo, branch);
        }
        dir = current.parent();
    }
    (None, None)
}

fn parse_head_branch(head: &str) -> Option<String> {
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .map(str::to_string)
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
