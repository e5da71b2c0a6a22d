// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal multiplexer adapter
//!
//! Every operation is tolerant of the session or window not existing: the
//! caller gets a well-defined "not found" value (`false`, empty vec,
//! `None`), never a panic, and the daemon loops keep running.

mod cli;

pub use cli::TmuxCli;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTmuxAdapter, TmuxCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from multiplexer operations
#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("window not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("tmux command failed: {0}")]
    CommandFailed(String),
}

/// One window as reported by `list-windows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub index: u32,
    pub name: String,
    pub active: bool,
}

/// Special keys the actuator may send instead of literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmuxKey {
    Enter,
    Escape,
    Tab,
    Space,
    Up,
    Down,
    Left,
    Right,
    Backspace,
    /// Interrupt; used by restart, deliberately not reachable from the
    /// operator-facing key tokens.
    CtrlC,
}

impl TmuxKey {
    /// The reserved lowercase token accepted from callers (CLI/HTTP).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "enter" => Some(TmuxKey::Enter),
            "escape" => Some(TmuxKey::Escape),
            "tab" => Some(TmuxKey::Tab),
            "space" => Some(TmuxKey::Space),
            "up" => Some(TmuxKey::Up),
            "down" => Some(TmuxKey::Down),
            "left" => Some(TmuxKey::Left),
            "right" => Some(TmuxKey::Right),
            "bspace" | "backspace" => Some(TmuxKey::Backspace),
            _ => None,
        }
    }

    /// tmux key name for `send-keys`.
    pub fn tmux_name(self) -> &'static str {
        match self {
            TmuxKey::Enter => "Enter",
            TmuxKey::Escape => "Escape",
            TmuxKey::Tab => "Tab",
            TmuxKey::Space => "Space",
            TmuxKey::Up => "Up",
            TmuxKey::Down => "Down",
            TmuxKey::Left => "Left",
            TmuxKey::Right => "Right",
            TmuxKey::Backspace => "BSpace",
            TmuxKey::CtrlC => "C-c",
        }
    }
}

/// Adapter for the terminal multiplexer hosting the fleet.
#[async_trait]
pub trait TmuxAdapter: Clone + Send + Sync + 'static {
    /// Check whether a tmux session exists.
    async fn has_session(&self, session: &str) -> bool;

    /// Create a detached tmux session.
    async fn new_session(&self, session: &str) -> Result<(), TmuxError>;

    /// List windows in a session. Empty when the session does not exist.
    async fn list_windows(&self, session: &str) -> Vec<WindowInfo>;

    /// Create a window; the multiplexer assigns the index.
    async fn new_window(
        &self,
        session: &str,
        name: &str,
        cwd: Option<&Path>,
        command: Option<&str>,
    ) -> Result<u32, TmuxError>;

    /// Kill a window. Succeeds when the window is already gone.
    async fn kill_window(&self, session: &str, window: u32) -> Result<(), TmuxError>;

    /// Focus a window.
    async fn select_window(&self, session: &str, window: u32) -> Result<(), TmuxError>;

    /// Capture the last `lines` of pane text, control sequences preserved.
    /// `None` on any lookup error.
    async fn capture_pane(&self, session: &str, window: u32, lines: u32) -> Option<String>;

    /// Send literal text. With `enter`, the Enter keystroke goes out as a
    /// second call so long text cannot be partially committed.
    async fn send_keys(
        &self,
        session: &str,
        window: u32,
        text: &str,
        enter: bool,
    ) -> Result<(), TmuxError>;

    /// Send a special key without any text.
    async fn send_key(&self, session: &str, window: u32, key: TmuxKey) -> Result<(), TmuxError>;

    /// Load a file into the multiplexer's paste buffer.
    async fn load_buffer(&self, path: &Path) -> Result<(), TmuxError>;

    /// Paste the current buffer into a window.
    async fn paste_buffer(&self, session: &str, window: u32) -> Result<(), TmuxError>;

    /// Drop memoized lookups. `None` clears everything; a session clears
    /// that session's subtree; a window clears just that window.
    ///
    /// Mutating operations do not invalidate automatically; callers
    /// invalidate after known-destructive ops.
    fn invalidate_cache(&self, session: Option<&str>, window: Option<u32>);
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
