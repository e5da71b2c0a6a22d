// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pane-text classifier.
//!
//! Rules run in a fixed order, first match wins. Two hard-won exceptions
//! are encoded here: the `⏵⏵ bypass permissions on` status-bar line
//! contains the word "permission" but is UI chrome, and autocomplete
//! suggestion lines (`> text … ↵ send`) mean the agent is idle, not
//! stalled. The content-change hash is computed over the normalized body
//! with the dynamic status-bar tail stripped so token-counter updates do
//! not read as progress.

use crate::detector::{Detection, StatusDetector, PANE_CAPTURE_LINES};
use async_trait::async_trait;
use oc_adapters::TmuxAdapter;
use oc_core::session::Session;
use oc_core::status::AgentStatus;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Display truncation width for activity lines.
const ACTIVITY_WIDTH: usize = 80;

/// Indicators that the agent is actively producing output.
const ACTIVE_INDICATORS: &[&str] = &[
    "esc to interrupt",
    "Running…",
    "Running...",
    "thinking",
    "✻",
    "✽",
    "✳",
    "✶",
    "⏺",
];

/// Status-bar chrome never participates in classification or hashing.
fn is_chrome_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("⏵⏵")
        || trimmed.contains("bypass permissions on")
        || (trimmed.contains("tokens") && trimmed.contains('·'))
}

/// Polling status detector for one tmux session scope.
pub struct PollingDetector<T: TmuxAdapter> {
    tmux_session: String,
    tmux: T,
    /// Previous content hash per session id, for change detection.
    content_hashes: Arc<Mutex<HashMap<String, [u8; 32]>>>,
}

impl<T: TmuxAdapter> PollingDetector<T> {
    pub fn new(tmux_session: impl Into<String>, tmux: T) -> Self {
        Self {
            tmux_session: tmux_session.into(),
            tmux,
            content_hashes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn tmux_session(&self) -> &str {
        &self.tmux_session
    }

    fn classify(&self, session: &Session, pane: &str) -> Detection {
        let lines: Vec<&str> = pane.lines().collect();
        let body: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|line| !is_chrome_line(line))
            .collect();

        // Record the content hash on every observation so change detection
        // works across ticks regardless of which rule fires this time.
        let hash = content_hash(&body);
        let previous_hash = self
            .content_hashes
            .lock()
            .insert(session.id.clone(), hash);
        let content_changed = previous_hash.is_some_and(|previous| previous != hash);

        // 2. Shell prompt at the bottom: the agent process exited
        if let Some(last) = body.iter().rev().find(|l| !l.trim().is_empty()) {
            if is_shell_prompt(last) {
                return Detection::new(AgentStatus::Terminated, "Shell prompt visible", pane);
            }
        }

        // 3. Permission prompt (outside the status-bar chrome)
        if let Some(question) = find_permission_prompt(&body) {
            return Detection::new(
                AgentStatus::WaitingUser,
                format!("Permission: {}", clean_line(question)),
                pane,
            );
        }

        // 4. Autocomplete suggestion: idle, must not fall through to stalled
        if body.iter().any(|l| is_autocomplete_line(l)) {
            return Detection::new(AgentStatus::WaitingUser, "Waiting for user input", pane);
        }

        let has_active = body
            .iter()
            .any(|l| ACTIVE_INDICATORS.iter().any(|ind| l.contains(ind)));

        // 5. Typed input with no response and nothing running: stalled
        if !has_active && has_stalled_input(&body) {
            return Detection::new(
                AgentStatus::WaitingUser,
                "Stalled: no response to user input",
                pane,
            );
        }

        // 6. Empty prompt line at the bottom
        if has_empty_prompt(&body) {
            return Detection::new(AgentStatus::WaitingUser, "Waiting for user input", pane);
        }

        // 7. Active indicators in the body
        if has_active {
            let activity = body
                .iter()
                .rev()
                .find(|l| ACTIVE_INDICATORS.iter().any(|ind| l.contains(ind)))
                .map(|l| clean_line(l))
                .unwrap_or_else(|| "Working".to_string());
            return Detection::new(AgentStatus::Running, activity, pane);
        }

        // 8. Content changed since the previous observation
        if content_changed {
            let last = body
                .iter()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| clean_line(l))
                .unwrap_or_default();
            return Detection::new(AgentStatus::Running, format!("Active: {last}"), pane);
        }

        // 9./10. Idle: green when standing instructions are set
        if session.standing_instructions.trim().is_empty() {
            Detection::new(
                AgentStatus::NoInstructions,
                "Idle - no standing instructions",
                pane,
            )
        } else {
            Detection::new(AgentStatus::Running, "Following standing instructions", pane)
        }
    }
}

#[async_trait]
impl<T: TmuxAdapter> StatusDetector for PollingDetector<T> {
    async fn detect(&self, session: &Session) -> Detection {
        let pane = self
            .tmux
            .capture_pane(&self.tmux_session, session.tmux_window, PANE_CAPTURE_LINES)
            .await;

        match pane {
            Some(pane) if !pane.trim().is_empty() => self.classify(session, &pane),
            _ => Detection::new(AgentStatus::WaitingUser, "Unable to read pane", ""),
        }
    }

    async fn pane_content(&self, window: u32, lines: u32) -> Option<String> {
        self.tmux
            .capture_pane(&self.tmux_session, window, lines)
            .await
    }
}

/// A `user@host path %` style prompt with no Claude chrome on the line.
fn is_shell_prompt(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.starts_with('>') || trimmed.starts_with('›') {
        return false;
    }
    let Some(last) = trimmed.chars().last() else {
        return false;
    };
    matches!(last, '%' | '$' | '#') && trimmed.contains('@')
}

/// `Do you want to proceed?` followed by a numbered option list.
fn find_permission_prompt<'a>(body: &[&'a str]) -> Option<&'a str> {
    let question_idx = body
        .iter()
        .position(|l| l.contains("Do you want to proceed?") || l.contains("Do you want to"))?;
    let has_options = body[question_idx..].iter().any(|l| {
        let t = l.trim_start_matches('❯').trim();
        t.starts_with("1.") || t.starts_with("2.")
    });
    has_options.then(|| body[question_idx])
}

/// `> some text   ↵ send` — the runtime suggesting a completion.
fn is_autocomplete_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('>') && trimmed.contains("↵ send")
}

/// A typed input line (`> text`, often with a non-breaking space) as the
/// last meaningful content.
fn has_stalled_input(body: &[&str]) -> bool {
    let Some(last) = body.iter().rev().find(|l| !l.trim().is_empty()) else {
        return false;
    };
    let trimmed = last.trim();
    let Some(rest) = trimmed.strip_prefix('>') else {
        return false;
    };
    let rest = rest.replace('\u{a0}', " ");
    !rest.trim().is_empty()
}

/// A lone `>` or `›` near the bottom.
fn has_empty_prompt(body: &[&str]) -> bool {
    body.iter()
        .rev()
        .filter(|l| !l.trim().is_empty())
        .take(5)
        .any(|l| {
            let trimmed = l.trim().replace('\u{a0}', " ");
            let trimmed = trimmed.trim();
            trimmed == ">" || trimmed == "›"
        })
}

/// Strip display prefixes and truncate for activity text.
pub(crate) fn clean_line(line: &str) -> String {
    let mut cleaned = line.trim();
    for prefix in ["> ", "› ", "- ", "• "] {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest;
            break;
        }
    }
    let cleaned = cleaned.trim();
    if cleaned.chars().count() > ACTIVITY_WIDTH {
        let truncated: String = cleaned.chars().take(ACTIVITY_WIDTH - 3).collect();
        format!("{truncated}...")
    } else {
        cleaned.to_string()
    }
}

/// Whether the pane ends at a shell prompt (used by the hook detector to
/// disambiguate SessionEnd: real exit vs `/clear`).
pub(crate) fn shell_prompt_visible(pane: &str) -> bool {
    pane.lines()
        .filter(|l| !is_chrome_line(l))
        .filter(|l| !l.trim().is_empty())
        .next_back()
        .is_some_and(is_shell_prompt)
}

/// Hash of the normalized body (chrome already excluded) so cosmetic
/// status-bar updates never read as new output.
fn content_hash(body: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for line in body {
        hasher.update(line.trim_end().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().into()
}

#[cfg(test)]
#[path = "polling_tests.rs"]
mod tests;
