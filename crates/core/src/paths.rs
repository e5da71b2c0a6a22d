// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout under the operator-configurable base directory.
//!
//! Constructed once at process entry from the environment and passed down;
//! nothing in the workspace reads these env vars at call time.

use std::path::{Path, PathBuf};

/// Env var overriding the base directory (default `~/.overcode`).
pub const ENV_DIR: &str = "OVERCODE_DIR";
/// Env var overriding the sessions state directory only.
pub const ENV_STATE_DIR: &str = "OVERCODE_STATE_DIR";
/// Env var naming an isolated tmux socket (tests).
pub const ENV_TMUX_SOCKET: &str = "OVERCODE_TMUX_SOCKET";
/// Identity env vars set inside an agent's shell.
pub const ENV_SESSION_NAME: &str = "OVERCODE_SESSION_NAME";
pub const ENV_TMUX_SESSION: &str = "OVERCODE_TMUX_SESSION";
pub const ENV_PARENT_SESSION_ID: &str = "OVERCODE_PARENT_SESSION_ID";
pub const ENV_PARENT_NAME: &str = "OVERCODE_PARENT_NAME";

/// Resolved path layout for one process.
#[derive(Debug, Clone)]
pub struct OvercodePaths {
    base_dir: PathBuf,
    sessions_dir: PathBuf,
}

impl OvercodePaths {
    /// Resolve from `OVERCODE_DIR` / `OVERCODE_STATE_DIR`, falling back to
    /// `~/.overcode`.
    pub fn from_env() -> Self {
        let base_dir = std::env::var_os(ENV_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_base_dir);
        let sessions_dir = std::env::var_os(ENV_STATE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("sessions"));
        Self {
            base_dir,
            sessions_dir,
        }
    }

    /// Fixed base for tests.
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let sessions_dir = base_dir.join("sessions");
        Self {
            base_dir,
            sessions_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Per-tmux-session state directory.
    pub fn session_dir(&self, tmux_session: &str) -> PathBuf {
        self.sessions_dir.join(tmux_session)
    }

    /// Create the per-tmux-session directory if needed.
    pub fn ensure_session_dir(&self, tmux_session: &str) -> std::io::Result<PathBuf> {
        let dir = self.session_dir(tmux_session);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn sessions_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("sessions.json")
    }

    pub fn archived_sessions_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("archived_sessions.json")
    }

    pub fn monitor_pid_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("monitor_daemon.pid")
    }

    pub fn monitor_log_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("monitor_daemon.log")
    }

    pub fn monitor_state_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("monitor_daemon_state.json")
    }

    pub fn supervisor_pid_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("supervisor_daemon.pid")
    }

    pub fn supervisor_log_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("supervisor_daemon.log")
    }

    pub fn supervisor_stats_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("supervisor_stats.json")
    }

    /// 0-byte file; touching it wakes the daemons early.
    pub fn activity_signal_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("activity_signal")
    }

    pub fn heartbeat_file(&self, tmux_session: &str, name: &str) -> PathBuf {
        self.session_dir(tmux_session)
            .join(format!("heartbeat_{name}.last"))
    }

    pub fn hook_state_file(&self, tmux_session: &str, name: &str) -> PathBuf {
        self.session_dir(tmux_session)
            .join(format!("hook_state_{name}.json"))
    }

    pub fn agent_history_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("agent_status_history.csv")
    }

    pub fn presence_log_file(&self, tmux_session: &str) -> PathBuf {
        self.session_dir(tmux_session).join("presence_log.csv")
    }
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".overcode")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
