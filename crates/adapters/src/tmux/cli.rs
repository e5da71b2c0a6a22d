// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux adapter backed by the `tmux` binary

use super::{TmuxAdapter, TmuxError, TmuxKey, WindowInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Per-call timeout. A hung tmux server must not stall a daemon tick.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct LookupCache {
    sessions: HashMap<String, bool>,
    windows: HashMap<String, Vec<WindowInfo>>,
}

/// Tmux adapter that shells out to the `tmux` binary.
///
/// Session-existence and window-list lookups are memoized per instance;
/// see [`TmuxAdapter::invalidate_cache`].
#[derive(Clone, Default)]
pub struct TmuxCli {
    socket: Option<String>,
    cache: Arc<Mutex<LookupCache>>,
}

impl TmuxCli {
    pub fn new(socket: Option<String>) -> Self {
        Self {
            socket,
            cache: Arc::new(Mutex::new(LookupCache::default())),
        }
    }

    /// Honor `OVERCODE_TMUX_SOCKET` for test isolation.
    pub fn from_env() -> Self {
        Self::new(std::env::var(oc_core::paths::ENV_TMUX_SOCKET).ok())
    }

    /// Verify the tmux binary is reachable.
    pub async fn check_available(&self) -> bool {
        matches!(self.run(&["-V"]).await, Ok(output) if output.status.success())
    }

    async fn run(&self, args: &[&str]) -> Result<Output, TmuxError> {
        let mut cmd = Command::new("tmux");
        if let Some(ref socket) = self.socket {
            cmd.arg("-L").arg(socket);
        }
        cmd.args(args);

        match tokio::time::timeout(CALL_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(TmuxError::CommandFailed(e.to_string())),
            Err(_) => Err(TmuxError::CommandFailed(format!(
                "tmux {} timed out after {}s",
                args.first().unwrap_or(&""),
                CALL_TIMEOUT.as_secs()
            ))),
        }
    }

    fn target(session: &str, window: u32) -> String {
        format!("{session}:{window}")
    }
}

#[async_trait]
impl TmuxAdapter for TmuxCli {
    async fn has_session(&self, session: &str) -> bool {
        if let Some(&known) = self.cache.lock().sessions.get(session) {
            return known;
        }
        let exists = match self.run(&["has-session", "-t", session]).await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        };
        self.cache
            .lock()
            .sessions
            .insert(session.to_string(), exists);
        exists
    }

    async fn new_session(&self, session: &str) -> Result<(), TmuxError> {
        let output = self
            .run(&["new-session", "-d", "-s", session])
            .await
            .map_err(|e| TmuxError::SpawnFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::SpawnFailed(stderr.to_string()));
        }
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Vec<WindowInfo> {
        if let Some(cached) = self.cache.lock().windows.get(session) {
            return cached.clone();
        }
        let output = match self
            .run(&[
                "list-windows",
                "-t",
                session,
                "-F",
                "#{window_index}\t#{window_name}\t#{window_active}",
            ])
            .await
        {
            Ok(output) if output.status.success() => output,
            _ => return Vec::new(),
        };

        let windows: Vec<WindowInfo> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| {
                let mut parts = line.split('\t');
                let index = parts.next()?.parse().ok()?;
                let name = parts.next()?.to_string();
                let active = parts.next()? == "1";
                Some(WindowInfo {
                    index,
                    name,
                    active,
                })
            })
            .collect();

        self.cache
            .lock()
            .windows
            .insert(session.to_string(), windows.clone());
        windows
    }

    async fn new_window(
        &self,
        session: &str,
        name: &str,
        cwd: Option<&Path>,
        command: Option<&str>,
    ) -> Result<u32, TmuxError> {
        let mut args: Vec<String> = vec![
            "new-window".into(),
            "-t".into(),
            session.into(),
            "-n".into(),
            name.into(),
            "-P".into(),
            "-F".into(),
            "#{window_index}".into(),
        ];
        if let Some(cwd) = cwd {
            args.push("-c".into());
            args.push(cwd.display().to_string());
        }
        if let Some(command) = command {
            args.push(command.into());
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run(&arg_refs).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session, name, stderr = %stderr, "tmux new-window failed");
            return Err(TmuxError::SpawnFailed(stderr.to_string()));
        }

        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .map_err(|_| TmuxError::SpawnFailed("unparseable window index".to_string()))
    }

    async fn kill_window(&self, session: &str, window: u32) -> Result<(), TmuxError> {
        // Already-dead windows are fine
        let _ = self
            .run(&["kill-window", "-t", &Self::target(session, window)])
            .await?;
        Ok(())
    }

    async fn select_window(&self, session: &str, window: u32) -> Result<(), TmuxError> {
        let output = self
            .run(&["select-window", "-t", &Self::target(session, window)])
            .await?;
        if !output.status.success() {
            return Err(TmuxError::NotFound(Self::target(session, window)));
        }
        Ok(())
    }

    async fn capture_pane(&self, session: &str, window: u32, lines: u32) -> Option<String> {
        let start = format!("-{lines}");
        let output = self
            .run(&[
                "capture-pane",
                "-t",
                &Self::target(session, window),
                "-p",
                "-e",
                "-S",
                &start,
            ])
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn send_keys(
        &self,
        session: &str,
        window: u32,
        text: &str,
        enter: bool,
    ) -> Result<(), TmuxError> {
        let target = Self::target(session, window);

        if !text.is_empty() {
            // -l = literal mode, -- guards text starting with '-'
            let output = self
                .run(&["send-keys", "-t", &target, "-l", "--", text])
                .await?;
            if !output.status.success() {
                return Err(TmuxError::NotFound(target));
            }
        }

        if enter {
            // Separate call so long text is fully committed before Enter
            let output = self.run(&["send-keys", "-t", &target, "Enter"]).await?;
            if !output.status.success() {
                return Err(TmuxError::NotFound(target));
            }
        }
        Ok(())
    }

    async fn send_key(&self, session: &str, window: u32, key: TmuxKey) -> Result<(), TmuxError> {
        let target = Self::target(session, window);
        let output = self
            .run(&["send-keys", "-t", &target, key.tmux_name()])
            .await?;
        if !output.status.success() {
            return Err(TmuxError::NotFound(target));
        }
        Ok(())
    }

    async fn load_buffer(&self, path: &Path) -> Result<(), TmuxError> {
        let path = path.display().to_string();
        let output = self.run(&["load-buffer", &path]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::CommandFailed(stderr.to_string()));
        }
        Ok(())
    }

    async fn paste_buffer(&self, session: &str, window: u32) -> Result<(), TmuxError> {
        let target = Self::target(session, window);
        let output = self.run(&["paste-buffer", "-t", &target]).await?;
        if !output.status.success() {
            return Err(TmuxError::NotFound(target));
        }
        Ok(())
    }

    fn invalidate_cache(&self, session: Option<&str>, window: Option<u32>) {
        let mut cache = self.cache.lock();
        match (session, window) {
            (None, _) => {
                cache.sessions.clear();
                cache.windows.clear();
            }
            (Some(session), None) => {
                cache.sessions.remove(session);
                cache.windows.remove(session);
            }
            (Some(session), Some(window)) => {
                if let Some(windows) = cache.windows.get_mut(session) {
                    windows.retain(|w| w.index != window);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
