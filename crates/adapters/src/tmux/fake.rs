// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake tmux adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{TmuxAdapter, TmuxError, TmuxKey, WindowInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded adapter call
#[derive(Debug, Clone, PartialEq)]
pub enum TmuxCall {
    NewSession { session: String },
    NewWindow { session: String, name: String, command: Option<String> },
    KillWindow { session: String, window: u32 },
    SelectWindow { session: String, window: u32 },
    CapturePane { session: String, window: u32 },
    SendKeys { session: String, window: u32, text: String, enter: bool },
    SendKey { session: String, window: u32, key: TmuxKey },
    LoadBuffer { path: PathBuf },
    PasteBuffer { session: String, window: u32 },
}

#[derive(Debug, Clone, Default)]
struct FakeWindow {
    name: String,
    active: bool,
    content: String,
}

#[derive(Default)]
struct FakeState {
    sessions: BTreeMap<String, BTreeMap<u32, FakeWindow>>,
    calls: Vec<TmuxCall>,
    buffer: String,
    fail_sends: bool,
}

/// In-memory tmux for deterministic tests.
#[derive(Clone, Default)]
pub struct FakeTmuxAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeTmuxAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<TmuxCall> {
        self.inner.lock().calls.clone()
    }

    /// Only the keystroke sends (text + keys), for assertion convenience.
    pub fn sent_keys(&self) -> Vec<TmuxCall> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TmuxCall::SendKeys { .. } | TmuxCall::SendKey { .. }))
            .cloned()
            .collect()
    }

    pub fn add_session(&self, session: &str) {
        self.inner
            .lock()
            .sessions
            .entry(session.to_string())
            .or_default();
    }

    /// Create a window directly (bypassing `new_window`) and return its index.
    pub fn add_window(&self, session: &str, name: &str) -> u32 {
        let mut inner = self.inner.lock();
        let windows = inner.sessions.entry(session.to_string()).or_default();
        let index = windows.keys().max().map_or(1, |max| max + 1);
        windows.insert(
            index,
            FakeWindow {
                name: name.to_string(),
                active: false,
                content: String::new(),
            },
        );
        index
    }

    /// Set the pane text `capture_pane` will return.
    pub fn set_pane_content(&self, session: &str, window: u32, content: &str) {
        if let Some(w) = self
            .inner
            .lock()
            .sessions
            .get_mut(session)
            .and_then(|ws| ws.get_mut(&window))
        {
            w.content = content.to_string();
        }
    }

    pub fn window_exists(&self, session: &str, window: u32) -> bool {
        self.inner
            .lock()
            .sessions
            .get(session)
            .is_some_and(|ws| ws.contains_key(&window))
    }

    pub fn remove_window(&self, session: &str, window: u32) {
        if let Some(ws) = self.inner.lock().sessions.get_mut(session) {
            ws.remove(&window);
        }
    }

    /// Make subsequent sends fail as if tmux errored.
    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.lock().fail_sends = fail;
    }

    /// Contents loaded by the last `load_buffer` call.
    pub fn buffer(&self) -> String {
        self.inner.lock().buffer.clone()
    }
}

#[async_trait]
impl TmuxAdapter for FakeTmuxAdapter {
    async fn has_session(&self, session: &str) -> bool {
        self.inner.lock().sessions.contains_key(session)
    }

    async fn new_session(&self, session: &str) -> Result<(), TmuxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::NewSession {
            session: session.to_string(),
        });
        inner.sessions.entry(session.to_string()).or_default();
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Vec<WindowInfo> {
        self.inner
            .lock()
            .sessions
            .get(session)
            .map(|ws| {
                ws.iter()
                    .map(|(&index, w)| WindowInfo {
                        index,
                        name: w.name.clone(),
                        active: w.active,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn new_window(
        &self,
        session: &str,
        name: &str,
        _cwd: Option<&Path>,
        command: Option<&str>,
    ) -> Result<u32, TmuxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::NewWindow {
            session: session.to_string(),
            name: name.to_string(),
            command: command.map(str::to_string),
        });
        let windows = inner.sessions.entry(session.to_string()).or_default();
        let index = windows.keys().max().map_or(1, |max| max + 1);
        windows.insert(
            index,
            FakeWindow {
                name: name.to_string(),
                active: true,
                content: String::new(),
            },
        );
        Ok(index)
    }

    async fn kill_window(&self, session: &str, window: u32) -> Result<(), TmuxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::KillWindow {
            session: session.to_string(),
            window,
        });
        if let Some(ws) = inner.sessions.get_mut(session) {
            ws.remove(&window);
        }
        Ok(())
    }

    async fn select_window(&self, session: &str, window: u32) -> Result<(), TmuxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::SelectWindow {
            session: session.to_string(),
            window,
        });
        match inner.sessions.get(session) {
            Some(ws) if ws.contains_key(&window) => Ok(()),
            _ => Err(TmuxError::NotFound(format!("{session}:{window}"))),
        }
    }

    async fn capture_pane(&self, session: &str, window: u32, lines: u32) -> Option<String> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::CapturePane {
            session: session.to_string(),
            window,
        });
        let content = inner.sessions.get(session)?.get(&window)?.content.clone();
        if content.is_empty() {
            return None;
        }
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines as usize);
        Some(all[start..].join("\n"))
    }

    async fn send_keys(
        &self,
        session: &str,
        window: u32,
        text: &str,
        enter: bool,
    ) -> Result<(), TmuxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::SendKeys {
            session: session.to_string(),
            window,
            text: text.to_string(),
            enter,
        });
        if inner.fail_sends {
            return Err(TmuxError::CommandFailed("injected failure".to_string()));
        }
        match inner.sessions.get(session) {
            Some(ws) if ws.contains_key(&window) => Ok(()),
            _ => Err(TmuxError::NotFound(format!("{session}:{window}"))),
        }
    }

    async fn send_key(&self, session: &str, window: u32, key: TmuxKey) -> Result<(), TmuxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::SendKey {
            session: session.to_string(),
            window,
            key,
        });
        if inner.fail_sends {
            return Err(TmuxError::CommandFailed("injected failure".to_string()));
        }
        match inner.sessions.get(session) {
            Some(ws) if ws.contains_key(&window) => Ok(()),
            _ => Err(TmuxError::NotFound(format!("{session}:{window}"))),
        }
    }

    async fn load_buffer(&self, path: &Path) -> Result<(), TmuxError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TmuxError::CommandFailed(e.to_string()))?;
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::LoadBuffer {
            path: path.to_path_buf(),
        });
        inner.buffer = content;
        Ok(())
    }

    async fn paste_buffer(&self, session: &str, window: u32) -> Result<(), TmuxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TmuxCall::PasteBuffer {
            session: session.to_string(),
            window,
        });
        let buffer = inner.buffer.clone();
        match inner
            .sessions
            .get_mut(session)
            .and_then(|ws| ws.get_mut(&window))
        {
            Some(w) => {
                w.content.push_str(&buffer);
                Ok(())
            }
            None => Err(TmuxError::NotFound(format!("{session}:{window}"))),
        }
    }

    fn invalidate_cache(&self, _session: Option<&str>, _window: Option<u32>) {
        // The fake has no cache
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
