// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor daemon.
//!
//! Reads the monitor's snapshot, selects non-green agents that need
//! attention, and runs at most one "robot supervisor" worker — a plain
//! `_daemon_claude` tmux window the daemon never talks to after launch.
//! The worker's effect on the fleet is visible only through the
//! supervisor log it writes, which is scanned every tick to credit
//! `steers_count`, and through the runtime's session files, which are
//! scanned for its token usage.

use crate::signals::{interruptible_sleep, Shutdown};
use chrono::{DateTime, NaiveDateTime, Utc};
use oc_adapters::{ClaudeProjects, TmuxAdapter};
use oc_core::clock::Clock;
use oc_core::paths::OvercodePaths;
use oc_core::snapshot::{MonitorSnapshot, SessionView};
use oc_core::supervisor::SupervisorStats;
use oc_launcher::{paste_prompt, DAEMON_CLAUDE_WINDOW_NAME};
use oc_storage::{load_supervisor_stats, read_json, save_supervisor_stats, SessionRegistry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Standing-instructions sentinel that opts an agent out of supervision.
pub const DO_NOTHING_INSTRUCTIONS: &str = "DO_NOTHING";

/// Timestamp format of supervisor log lines: `Wed 15 Jan 2025 10:30:00 UTC`.
const LOG_TIMESTAMP_FORMAT: &str = "%a %d %b %Y %H:%M:%S UTC";

/// Phrases that count a log line as an intervention.
const ACTION_PHRASES: &[&str] = &["approved", "rejected", "sent ", "provided", "unblocked"];

/// Phrases that veto a line even when an action phrase matches.
const NO_ACTION_PHRASES: &[&str] = &["no intervention needed", "no action needed"];

/// Pane markers meaning the worker is still busy.
const WORKER_ACTIVE_MARKERS: &[&str] = &["· ", "Running…", "(esc to interrupt", "✽"];

/// Supervisor loop settings.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub tmux_session: String,
    pub interval: Duration,
    /// How fresh the monitor snapshot must be before we act on it.
    pub monitor_stale_seconds: i64,
    /// Delay before the worker's context prompt is pasted.
    pub worker_startup_delay: Duration,
}

impl SupervisorConfig {
    pub fn new(tmux_session: impl Into<String>) -> Self {
        Self {
            tmux_session: tmux_session.into(),
            interval: Duration::from_secs(15),
            monitor_stale_seconds: 60,
            worker_startup_delay: Duration::from_secs(2),
        }
    }
}

pub struct SupervisorDaemon<T: TmuxAdapter, C: Clock> {
    config: SupervisorConfig,
    registry: SessionRegistry,
    tmux: T,
    clock: C,
    projects: ClaudeProjects,
    stats: SupervisorStats,
    stats_file: PathBuf,
    log_file: PathBuf,
    monitor_state_file: PathBuf,
    signal_file: PathBuf,
    /// The worker's cwd, where its runtime transcripts accumulate.
    worker_directory: PathBuf,
    daemon_claude_window: Option<u32>,
    daemon_claude_launch_time: Option<DateTime<Utc>>,
    /// Intervention totals already credited for the current launch.
    applied_interventions: HashMap<String, u64>,
    shutdown: Shutdown,
}

impl<T: TmuxAdapter, C: Clock> SupervisorDaemon<T, C> {
    pub fn new(
        config: SupervisorConfig,
        paths: &OvercodePaths,
        registry: SessionRegistry,
        tmux: T,
        clock: C,
    ) -> Self {
        let tmux_session = &config.tmux_session;
        let stats_file = paths.supervisor_stats_file(tmux_session);
        Self {
            stats: load_supervisor_stats(&stats_file),
            stats_file,
            log_file: paths.supervisor_log_file(tmux_session),
            monitor_state_file: paths.monitor_state_file(tmux_session),
            signal_file: paths.activity_signal_file(tmux_session),
            worker_directory: paths.session_dir(tmux_session),
            config,
            registry,
            tmux,
            clock,
            projects: ClaudeProjects::from_home(),
            daemon_claude_window: None,
            daemon_claude_launch_time: None,
            applied_interventions: HashMap::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Override the runtime transcript root (tests).
    pub fn with_projects(mut self, projects: ClaudeProjects) -> Self {
        self.projects = projects;
        self
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> &SupervisorStats {
        &self.stats
    }

    /// Wait until the monitor daemon has published a fresh snapshot.
    /// Returns false when the timeout expires first.
    pub async fn wait_for_monitor(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.read_monitor_snapshot().is_some() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline || self.shutdown.is_triggered() {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Run the loop until shutdown.
    pub async fn run(&mut self) {
        tracing::info!(tmux_session = %self.config.tmux_session, "supervisor daemon started");
        if !self.wait_for_monitor(Duration::from_secs(60)).await {
            tracing::warn!("monitor daemon not detected, proceeding anyway");
        }
        while !self.shutdown.is_triggered() {
            self.tick().await;
            interruptible_sleep(self.config.interval, &self.shutdown, &self.signal_file).await;
        }
        tracing::info!("supervisor daemon stopped");
    }

    /// One supervisor tick.
    pub async fn tick(&mut self) {
        self.cleanup_stale_daemon_claudes().await;

        if self.daemon_claude_window.is_some() && self.is_daemon_claude_done().await {
            self.mark_daemon_claude_stopped();
            self.kill_daemon_claude().await;
        }

        // Interventions are credited on every tick, running worker or not
        let names: Vec<String> = self.registry.list_sessions().iter().map(|s| s.name.clone()).collect();
        self.update_intervention_counts(&names);

        self.sync_daemon_claude_tokens();

        if self.daemon_claude_window.is_none() {
            if let Some(snapshot) = self.read_monitor_snapshot() {
                let attention = self.get_non_green_sessions(&snapshot);
                if !attention.is_empty() {
                    let context = build_daemon_claude_context(&attention);
                    if let Err(e) = self.launch_daemon_claude(&context).await {
                        tracing::error!(error = %e, "worker launch failed");
                        self.stats.record_stopped(self.clock.now());
                    }
                }
            }
        }

        if let Err(e) = save_supervisor_stats(&self.stats_file, &self.stats) {
            tracing::error!(error = %e, "failed to persist supervisor stats");
        }
    }

    fn read_monitor_snapshot(&self) -> Option<MonitorSnapshot> {
        let snapshot: MonitorSnapshot = read_json(&self.monitor_state_file).ok()??;
        if snapshot.is_stale(self.config.monitor_stale_seconds, self.clock.now()) {
            return None;
        }
        Some(snapshot)
    }

    /// The attention set: non-green, awake, supervisable agents.
    pub fn get_non_green_sessions(&self, snapshot: &MonitorSnapshot) -> Vec<SessionView> {
        snapshot
            .sessions
            .iter()
            .filter(|view| !view.current_status.is_green())
            .filter(|view| !view.is_asleep)
            .filter(|view| view.standing_instructions != DO_NOTHING_INSTRUCTIONS)
            .filter(|view| view.name != DAEMON_CLAUDE_WINDOW_NAME)
            .filter(|view| !view.budget_exceeded)
            .cloned()
            .collect()
    }

    /// Whether the tracked worker window still exists.
    pub async fn is_daemon_claude_running(&self) -> bool {
        let Some(window) = self.daemon_claude_window else {
            return false;
        };
        self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);
        self.window_exists(window).await
    }

    /// Completion heuristic over the worker's pane.
    ///
    /// Window gone → done. Active markers or an unanswered tool call →
    /// not done. A bare prompt in the last lines → done. An unreadable
    /// pane on a live window reads as a capture hiccup, not completion.
    pub async fn is_daemon_claude_done(&self) -> bool {
        let Some(window) = self.daemon_claude_window else {
            return true;
        };
        self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);
        if !self.window_exists(window).await {
            return true;
        }

        let Some(pane) = self
            .tmux
            .capture_pane(&self.config.tmux_session, window, 30)
            .await
        else {
            return false;
        };

        if WORKER_ACTIVE_MARKERS.iter().any(|marker| pane.contains(marker)) {
            return false;
        }
        if has_unanswered_tool_call(&pane) {
            return false;
        }

        let lines: Vec<&str> = pane.lines().collect();
        let tail_start = lines.len().saturating_sub(10);
        lines[tail_start..]
            .iter()
            .any(|line| matches!(line.trim(), ">" | "›"))
    }

    /// Fold the finished run into the cumulative counter.
    pub fn mark_daemon_claude_stopped(&mut self) {
        self.stats.record_stopped(self.clock.now());
    }

    /// Kill the tracked worker window, if any.
    pub async fn kill_daemon_claude(&mut self) {
        if let Some(window) = self.daemon_claude_window.take() {
            self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);
            if self.window_exists(window).await {
                let _ = self.tmux.kill_window(&self.config.tmux_session, window).await;
            }
            self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);
        }
        self.daemon_claude_launch_time = None;
    }

    /// Exclusivity invariant: at most one `_daemon_claude` window exists.
    /// Orphans (from a crashed predecessor) are killed on sight; a
    /// vanished tracked window clears the reference.
    pub async fn cleanup_stale_daemon_claudes(&mut self) {
        self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);
        let windows = self.tmux.list_windows(&self.config.tmux_session).await;

        for window in &windows {
            if window.name == DAEMON_CLAUDE_WINDOW_NAME
                && Some(window.index) != self.daemon_claude_window
            {
                tracing::warn!(window = window.index, "killing orphaned worker window");
                let _ = self
                    .tmux
                    .kill_window(&self.config.tmux_session, window.index)
                    .await;
            }
        }

        if let Some(tracked) = self.daemon_claude_window {
            if !windows.iter().any(|w| w.index == tracked) {
                tracing::info!("tracked worker window is gone");
                self.daemon_claude_window = None;
                self.mark_daemon_claude_stopped();
            }
        }
        self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);
    }

    /// Tally intervention lines per session from the supervisor log,
    /// counting only entries after the current worker's launch time.
    pub fn count_interventions_from_log(&self, names: &[String]) -> HashMap<String, u64> {
        let Some(launch_time) = self.daemon_claude_launch_time else {
            return HashMap::new();
        };
        let Ok(content) = std::fs::read_to_string(&self.log_file) else {
            return HashMap::new();
        };

        let mut counts = HashMap::new();
        for line in content.lines() {
            let Some((timestamp, rest)) = parse_log_line(line) else {
                continue;
            };
            if timestamp <= launch_time {
                continue;
            }
            let Some((who, action)) = rest.split_once(" - ") else {
                continue;
            };
            if !names.iter().any(|name| name == who) {
                continue;
            }
            let action_lower = action.to_lowercase();
            if NO_ACTION_PHRASES.iter().any(|p| action_lower.contains(p)) {
                continue;
            }
            if ACTION_PHRASES.iter().any(|p| action_lower.contains(p)) {
                *counts.entry(who.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Credit newly observed interventions to `steers_count`, once each.
    pub fn update_intervention_counts(&mut self, names: &[String]) {
        let counts = self.count_interventions_from_log(names);
        for (name, total) in counts {
            let applied = self.applied_interventions.get(&name).copied().unwrap_or(0);
            if total <= applied {
                continue;
            }
            let delta = total - applied;
            let Some(session) = self.registry.get_session_by_name(&name) else {
                continue;
            };
            match self
                .registry
                .update_stats(&session.id, |stats| stats.steers_count += delta)
            {
                Ok(()) => {
                    self.applied_interventions.insert(name, total);
                }
                Err(e) => tracing::warn!(name = %session.name, error = %e, "steers update failed"),
            }
        }
    }

    /// Tally runtime transcripts the worker produced that we have not seen.
    pub fn sync_daemon_claude_tokens(&mut self) {
        let mut changed = false;
        for file in self.projects.list_session_files(&self.worker_directory) {
            let Some(id) = file.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            if self.stats.seen_session_ids.iter().any(|seen| *seen == id) {
                continue;
            }
            let Some(usage) = oc_adapters::claude::parse_usage(&file) else {
                tracing::warn!(file = %file.display(), "unreadable worker transcript");
                continue;
            };
            if self.stats.add_usage(&id, &usage) {
                changed = true;
            }
        }
        if changed {
            if let Err(e) = save_supervisor_stats(&self.stats_file, &self.stats) {
                tracing::error!(error = %e, "failed to persist supervisor stats");
            }
        }
    }

    /// Open the exclusive worker window with the attention-set context as
    /// its initial prompt.
    pub async fn launch_daemon_claude(
        &mut self,
        context: &str,
    ) -> Result<(), oc_adapters::TmuxError> {
        let command = "claude code --dangerously-skip-permissions";
        let window = self
            .tmux
            .new_window(
                &self.config.tmux_session,
                DAEMON_CLAUDE_WINDOW_NAME,
                Some(&self.worker_directory),
                Some(command),
            )
            .await?;
        self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);

        paste_prompt(
            &self.tmux,
            &self.config.tmux_session,
            window,
            context,
            self.config.worker_startup_delay,
        )
        .await?;

        let now = self.clock.now();
        self.daemon_claude_window = Some(window);
        self.daemon_claude_launch_time = Some(now);
        self.applied_interventions.clear();
        self.stats.record_launch(now);
        tracing::info!(window, "worker launched");
        Ok(())
    }

    async fn window_exists(&self, window: u32) -> bool {
        self.tmux
            .list_windows(&self.config.tmux_session)
            .await
            .iter()
            .any(|w| w.index == window)
    }

    #[cfg(test)]
    fn set_worker_for_test(&mut self, window: Option<u32>, launch_time: Option<DateTime<Utc>>) {
        self.daemon_claude_window = window;
        self.daemon_claude_launch_time = launch_time;
    }
}

/// `Wed 15 Jan 2025 10:30:00 UTC: agent-1 - Tool call approved`
fn parse_log_line(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let marker = " UTC: ";
    let idx = line.find(marker)?;
    let timestamp_str = &line[..idx + 4]; // include " UTC"
    let rest = &line[idx + marker.len()..];
    let parsed = NaiveDateTime::parse_from_str(timestamp_str, LOG_TIMESTAMP_FORMAT).ok()?;
    Some((parsed.and_utc(), rest))
}

/// A `⏺` tool-call marker with no `⎿` result marker after the last one.
fn has_unanswered_tool_call(pane: &str) -> bool {
    let Some(last_call) = pane.rfind('⏺') else {
        return false;
    };
    !pane[last_call..].contains('⎿')
}

/// The worker's initial prompt: one block per attention-set agent.
pub fn build_daemon_claude_context(sessions: &[SessionView]) -> String {
    let mut context = String::from(
        "You are the robot supervisor. These agents are blocked or idle and need attention:\n",
    );
    for view in sessions {
        context.push_str(&format!(
            "\n- {} (window {}): {} — {}\n",
            view.name, view.tmux_window, view.current_status, view.current_activity
        ));
        if !view.standing_instructions.is_empty() {
            context.push_str(&format!(
                "  Standing instructions: {}\n",
                view.standing_instructions
            ));
        }
        if let Some(ref repo) = view.repo_name {
            context.push_str(&format!("  Repo: {repo}\n"));
        }
    }
    context.push_str(
        "\nFor each agent, inspect its window and either approve, unblock, or send guidance. \
         Log every action to the supervisor log; write 'no intervention needed' when an agent \
         only needs to keep running.\n",
    );
    context
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
