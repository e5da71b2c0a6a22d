// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session name validation.
//!
//! Names end up in tmux window titles, file names (`heartbeat_<name>.last`,
//! `hook_state_<name>.json`) and shell command lines, so the accepted
//! alphabet is deliberately conservative.

use thiserror::Error;

/// Maximum accepted session name length.
pub const MAX_NAME_LEN: usize = 64;

const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '<', '>', '$', '\\', '`'];

/// Why a session name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("session name must not be empty")]
    Empty,
    #[error("session name is {0} characters (max {MAX_NAME_LEN})")]
    TooLong(usize),
    #[error("session name contains shell metacharacter '{0}'")]
    ShellMetacharacter(char),
    #[error("session name contains whitespace")]
    Whitespace,
    #[error("session name contains path traversal '..'")]
    PathTraversal,
    #[error("session name contains invalid character '{0}'")]
    InvalidCharacter(char),
}

/// Validate a session name against the conservative `[A-Za-z0-9._-]` alphabet.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong(name.len()));
    }
    if name.contains("..") {
        return Err(NameError::PathTraversal);
    }
    for c in name.chars() {
        if SHELL_METACHARACTERS.contains(&c) {
            return Err(NameError::ShellMetacharacter(c));
        }
        if c.is_whitespace() || c == '\n' || c == '\r' || c == '\t' {
            return Err(NameError::Whitespace);
        }
        if !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-') {
            return Err(NameError::InvalidCharacter(c));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
