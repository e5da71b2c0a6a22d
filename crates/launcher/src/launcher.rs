// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch, steer and kill agent windows.

use crate::git::detect_repo;
use crate::prompt::paste_prompt;
use chrono::Utc;
use oc_adapters::{TmuxAdapter, TmuxError, TmuxKey};
use oc_core::name::NameError;
use oc_core::paths;
use oc_core::session::{Permissiveness, Session, SessionLifecycle};
use oc_storage::{RegistryError, SessionRegistry};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The supervisor worker's reserved window name. Never a fleet agent.
pub const DAEMON_CLAUDE_WINDOW_NAME: &str = "_daemon_claude";

/// Delay before an initial prompt is pasted into a freshly started agent.
const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(2);

/// Pause between Ctrl-C and the relaunch command on restart.
const RESTART_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("missing dependency: {0} not found on PATH")]
    Dependency(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Tmux(#[from] TmuxError),
}

/// What to launch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchSpec {
    pub name: String,
    pub start_directory: Option<PathBuf>,
    pub initial_prompt: Option<String>,
    pub permissiveness: Permissiveness,
    /// Parent session id. When unset, auto-detected from the
    /// `OVERCODE_PARENT_SESSION_ID` environment an agent shell carries.
    pub parent: Option<String>,
}

impl LaunchSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// The terminal actuator: the only component that mutates tmux state.
#[derive(Clone)]
pub struct Launcher<T: TmuxAdapter> {
    tmux_session: String,
    tmux: T,
    registry: SessionRegistry,
    runtime_binary: String,
    startup_delay: Duration,
}

impl<T: TmuxAdapter> Launcher<T> {
    pub fn new(tmux_session: impl Into<String>, tmux: T, registry: SessionRegistry) -> Self {
        Self {
            tmux_session: tmux_session.into(),
            tmux,
            registry,
            runtime_binary: "claude".to_string(),
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }

    pub fn with_runtime_binary(mut self, binary: impl Into<String>) -> Self {
        self.runtime_binary = binary.into();
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Fail fast when tmux or the agent runtime is missing from PATH.
    pub fn ensure_dependencies(&self) -> Result<(), LauncherError> {
        for binary in ["tmux", self.runtime_binary.as_str()] {
            if !binary_on_path(binary) {
                return Err(LauncherError::Dependency(binary.to_string()));
            }
        }
        Ok(())
    }

    /// The runtime command line for a permissiveness mode.
    pub fn command_for_mode(&self, mode: Permissiveness) -> String {
        match mode {
            Permissiveness::Normal => format!("{} code", self.runtime_binary),
            Permissiveness::Permissive => {
                format!("{} code --permission-mode acceptEdits", self.runtime_binary)
            }
            Permissiveness::Bypass => {
                format!("{} code --dangerously-skip-permissions", self.runtime_binary)
            }
        }
    }

    /// Open a window running the agent and register its session record.
    /// Launching an existing name returns the existing session unchanged.
    pub async fn launch(&self, spec: LaunchSpec) -> Result<Session, LauncherError> {
        oc_core::name::validate_name(&spec.name)?;

        if let Some(existing) = self.registry.get_session_by_name(&spec.name) {
            return Ok(existing);
        }

        if !self.tmux.has_session(&self.tmux_session).await {
            self.tmux.new_session(&self.tmux_session).await?;
            self.tmux.invalidate_cache(Some(&self.tmux_session), None);
        }

        let command = self.command_for_mode(spec.permissiveness);
        let window = self
            .tmux
            .new_window(
                &self.tmux_session,
                &spec.name,
                spec.start_directory.as_deref(),
                Some(&command),
            )
            .await?;
        self.tmux.invalidate_cache(Some(&self.tmux_session), None);

        let mut session = Session::new(
            &spec.name,
            &self.tmux_session,
            window,
            command.split_whitespace().map(str::to_string).collect(),
            Utc::now(),
        );
        session.permissiveness_mode = spec.permissiveness;
        session.start_directory = spec.start_directory.clone();
        if let Some(ref dir) = spec.start_directory {
            let (repo_name, branch) = detect_repo(dir);
            session.repo_name = repo_name;
            session.branch = branch;
        }
        session.parent_session_id = spec
            .parent
            .clone()
            .or_else(|| std::env::var(paths::ENV_PARENT_SESSION_ID).ok());

        let session = match self.registry.create_session(session) {
            Ok(session) => session,
            Err(e) => {
                // Depth/parent violations must not leave a stray window
                let _ = self.tmux.kill_window(&self.tmux_session, window).await;
                self.tmux.invalidate_cache(Some(&self.tmux_session), None);
                return Err(e.into());
            }
        };

        if let Some(ref prompt) = spec.initial_prompt {
            paste_prompt(
                &self.tmux,
                &self.tmux_session,
                window,
                prompt,
                self.startup_delay,
            )
            .await?;
        }

        tracing::info!(name = %session.name, window, "agent launched");
        Ok(session)
    }

    /// Send text (plus Enter) or one of the reserved key tokens to an
    /// agent. Updates `last_activity`; steers accounting stays with the
    /// supervisor's log parser so direct sends are never double-counted.
    pub async fn send_to_session(
        &self,
        name: &str,
        text: &str,
        enter: bool,
    ) -> Result<(), LauncherError> {
        let session = self
            .registry
            .get_session_by_name(name)
            .ok_or_else(|| LauncherError::NotFound(name.to_string()))?;

        match TmuxKey::parse(text) {
            Some(key) => {
                self.tmux
                    .send_key(&session.tmux_session, session.tmux_window, key)
                    .await?
            }
            None => {
                self.tmux
                    .send_keys(&session.tmux_session, session.tmux_window, text, enter)
                    .await?
            }
        }

        self.registry
            .update_stats(&session.id, |stats| stats.last_activity = Some(Utc::now()))?;
        Ok(())
    }

    /// Kill an agent. With `cascade`, the entire descendant subtree goes
    /// too; without it, children are orphaned in place. Returns how many
    /// records were removed. Records whose window already died still count.
    pub async fn kill_session(&self, name: &str, cascade: bool) -> Result<u32, LauncherError> {
        let session = self
            .registry
            .get_session_by_name(name)
            .ok_or_else(|| LauncherError::NotFound(name.to_string()))?;

        let mut doomed = vec![session.clone()];
        if cascade {
            doomed.extend(self.registry.get_descendants(&session.id));
        }

        let mut removed = 0;
        for victim in doomed {
            // A vanished window is fine; the record still goes
            let _ = self
                .tmux
                .kill_window(&victim.tmux_session, victim.tmux_window)
                .await;
            if self.registry.delete_session(&victim.id)? {
                removed += 1;
            }
        }
        self.tmux.invalidate_cache(Some(&self.tmux_session), None);

        tracing::info!(name, cascade, removed, "agent killed");
        Ok(removed)
    }

    /// Interrupt the agent and re-issue its runtime command. Identity and
    /// record are preserved.
    pub async fn restart_session(&self, name: &str) -> Result<(), LauncherError> {
        let session = self
            .registry
            .get_session_by_name(name)
            .ok_or_else(|| LauncherError::NotFound(name.to_string()))?;

        self.tmux
            .send_key(&session.tmux_session, session.tmux_window, TmuxKey::CtrlC)
            .await?;
        tokio::time::sleep(RESTART_DELAY).await;

        let command = self.command_for_mode(session.permissiveness_mode);
        self.tmux
            .send_keys(&session.tmux_session, session.tmux_window, &command, true)
            .await?;

        self.registry.update_session(&session.id, |session| {
            session.status = SessionLifecycle::Running;
        })?;
        tracing::info!(name, "agent restarted");
        Ok(())
    }

    /// Reconcile the registry against actual windows. Records without a
    /// window are marked terminated (a prior `done` is kept — it is the
    /// richer signal). Untracked agent-looking windows are killed when
    /// asked.
    pub async fn list_sessions(&self, kill_untracked: bool) -> Result<Vec<Session>, LauncherError> {
        self.tmux.invalidate_cache(Some(&self.tmux_session), None);
        let windows = self.tmux.list_windows(&self.tmux_session).await;
        let window_indexes: Vec<u32> = windows.iter().map(|w| w.index).collect();

        let mut result = Vec::new();
        for session in self.registry.list_sessions() {
            if window_indexes.contains(&session.tmux_window)
                || session.status == SessionLifecycle::Done
            {
                result.push(session);
                continue;
            }
            if session.status != SessionLifecycle::Terminated {
                let updated = self.registry.update_session(&session.id, |s| {
                    s.status = SessionLifecycle::Terminated;
                })?;
                result.push(updated);
            } else {
                result.push(session);
            }
        }

        if kill_untracked {
            let tracked: Vec<u32> = result.iter().map(|s| s.tmux_window).collect();
            for window in &windows {
                if tracked.contains(&window.index) {
                    continue;
                }
                if looks_agent_owned(&window.name) {
                    tracing::warn!(window = window.index, name = %window.name, "killing untracked agent window");
                    let _ = self.tmux.kill_window(&self.tmux_session, window.index).await;
                }
            }
            self.tmux.invalidate_cache(Some(&self.tmux_session), None);
        }

        Ok(result)
    }

    /// Archive terminated (and optionally done) records. Returns how many
    /// moved; already-clean registries yield 0.
    pub async fn cleanup_terminated(&self, include_done: bool) -> Result<u32, LauncherError> {
        let mut archived = 0;
        for session in self.registry.list_sessions() {
            let eligible = session.status == SessionLifecycle::Terminated
                || (include_done && session.status == SessionLifecycle::Done);
            if eligible && self.registry.archive_session(&session.id, Utc::now())? {
                archived += 1;
            }
        }
        Ok(archived)
    }

    /// Recent pane output for an agent, `None` when unavailable.
    pub async fn get_session_output(&self, name: &str, lines: u32) -> Option<String> {
        let session = self.registry.get_session_by_name(name)?;
        self.tmux
            .capture_pane(&session.tmux_session, session.tmux_window, lines)
            .await
    }

    /// Mark a child as done (it reported completion). `done` wins over a
    /// concurrent window death.
    pub fn mark_done(&self, name: &str) -> Result<(), LauncherError> {
        let session = self
            .registry
            .get_session_by_name(name)
            .ok_or_else(|| LauncherError::NotFound(name.to_string()))?;
        self.registry.update_session(&session.id, |session| {
            session.status = SessionLifecycle::Done;
        })?;
        Ok(())
    }
}

/// Heuristic for windows an operator's agent probably created: a valid
/// agent name that is not a stock shell window and not the supervisor
/// worker.
fn looks_agent_owned(window_name: &str) -> bool {
    if window_name == DAEMON_CLAUDE_WINDOW_NAME {
        return false;
    }
    if matches!(window_name, "zsh" | "bash" | "fish" | "sh" | "login") {
        return false;
    }
    oc_core::name::validate_name(window_name).is_ok()
}

fn binary_on_path(binary: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(binary).is_file())
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
