// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The monitor daemon: one control loop per tmux session.
//!
//! Per tick: detect every tracked agent's status, accumulate green /
//! non-green / sleep time with the uptime cap, sync token stats from the
//! runtime's own session files, send due heartbeats, publish the snapshot
//! and push it to the relay. Per-session failures are isolated: a broken
//! agent costs one log line, never the tick.

use crate::presence::PresenceProbe;
use crate::relay::{RelayClient, RelayConfig};
use crate::signals::{interruptible_sleep, touch_activity_signal, Shutdown};
use chrono::{DateTime, Utc};
use oc_adapters::{ClaudeProjects, TmuxAdapter};
use oc_core::accounting::{self, Pricing};
use oc_core::clock::Clock;
use oc_core::paths::OvercodePaths;
use oc_core::session::{Session, SessionLifecycle};
use oc_core::snapshot::{MonitorSnapshot, RelayState, SessionView};
use oc_core::status::AgentStatus;
use oc_status::{Detection, HookDetector, PollingDetector, StatusDetector};
use oc_storage::{
    append_agent_status, append_presence, load_supervisor_stats, write_json_atomic,
    SessionRegistry,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Monitor loop settings.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub tmux_session: String,
    /// Fixed fast loop interval, independent of load.
    pub interval: Duration,
    /// Minimum spacing between per-session stats syncs.
    pub stats_sync_interval: Duration,
    pub pricing: Pricing,
}

impl MonitorConfig {
    pub fn new(tmux_session: impl Into<String>) -> Self {
        Self {
            tmux_session: tmux_session.into(),
            interval: Duration::from_secs(10),
            stats_sync_interval: Duration::from_secs(60),
            pricing: Pricing::default(),
        }
    }
}

/// Per-session state the daemon keeps in memory between ticks.
#[derive(Default)]
struct TickMemory {
    last_status: HashMap<String, AgentStatus>,
    last_state_time: HashMap<String, DateTime<Utc>>,
    last_sync: HashMap<String, DateTime<Utc>>,
    last_logged_status: HashMap<String, AgentStatus>,
}

pub struct MonitorDaemon<T: TmuxAdapter, C: Clock, P: PresenceProbe> {
    config: MonitorConfig,
    paths: OvercodePaths,
    registry: SessionRegistry,
    tmux: T,
    clock: C,
    presence: P,
    polling: PollingDetector<T>,
    hook: HookDetector<T>,
    projects: ClaudeProjects,
    relay: Option<RelayClient>,
    shutdown: Shutdown,
    memory: TickMemory,
    loop_count: u64,
    relay_last_push: Option<DateTime<Utc>>,
    relay_last_status: RelayState,
    state_file: PathBuf,
    signal_file: PathBuf,
    history_file: PathBuf,
    presence_file: PathBuf,
    supervisor_stats_file: PathBuf,
}

impl<T: TmuxAdapter, C: Clock, P: PresenceProbe> MonitorDaemon<T, C, P> {
    pub fn new(
        config: MonitorConfig,
        paths: OvercodePaths,
        registry: SessionRegistry,
        tmux: T,
        clock: C,
        presence: P,
    ) -> Self {
        let tmux_session = config.tmux_session.clone();
        let polling = PollingDetector::new(&tmux_session, tmux.clone());
        let hook = HookDetector::new(&tmux_session, tmux.clone(), paths.session_dir(&tmux_session));
        Self {
            state_file: paths.monitor_state_file(&tmux_session),
            signal_file: paths.activity_signal_file(&tmux_session),
            history_file: paths.agent_history_file(&tmux_session),
            presence_file: paths.presence_log_file(&tmux_session),
            supervisor_stats_file: paths.supervisor_stats_file(&tmux_session),
            config,
            paths,
            registry,
            tmux,
            clock,
            presence,
            polling,
            hook,
            projects: ClaudeProjects::from_home(),
            relay: None,
            shutdown: Shutdown::new(),
            memory: TickMemory::default(),
            loop_count: 0,
            relay_last_push: None,
            relay_last_status: RelayState::Disabled,
        }
    }

    /// Override the runtime transcript root (tests).
    pub fn with_projects(mut self, projects: ClaudeProjects) -> Self {
        self.projects = projects;
        self
    }

    /// Enable the relay from `OVERCODE_RELAY_*` (process entry only).
    pub fn with_relay_from_env(mut self) -> Self {
        self.relay = RelayConfig::from_env().map(RelayClient::new);
        self
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run the loop until shutdown.
    pub async fn run(&mut self) {
        tracing::info!(tmux_session = %self.config.tmux_session, "monitor daemon started");
        while !self.shutdown.is_triggered() {
            let snapshot = self.tick().await;
            if let Err(e) = write_json_atomic(&self.state_file, &snapshot) {
                tracing::error!(error = %e, "failed to publish monitor state");
            }
            interruptible_sleep(self.config.interval, &self.shutdown, &self.signal_file).await;
        }
        tracing::info!("monitor daemon stopped");
    }

    /// One full tick. Returns the snapshot it would publish.
    pub async fn tick(&mut self) -> MonitorSnapshot {
        let now = self.clock.now();
        self.loop_count += 1;
        let mut errors = 0u32;

        // 1. Scope: sessions belonging to this daemon's tmux session
        let sessions: Vec<Session> = self
            .registry
            .list_sessions()
            .into_iter()
            .filter(|s| s.tmux_session == self.config.tmux_session)
            .collect();

        // 2. Presence sample
        let presence = self.presence.sample();
        if let Some(sample) = presence {
            if let Err(e) = append_presence(&self.presence_file, now, sample.state) {
                tracing::warn!(error = %e, "presence log append failed");
            }
        }

        // 3. Per-session pipeline, deterministic registry order
        self.tmux.invalidate_cache(Some(&self.config.tmux_session), None);
        let mut views = Vec::with_capacity(sessions.len());
        for session in &sessions {
            match self.observe_session(session, now).await {
                Ok(view) => views.push(view),
                Err(e) => {
                    errors += 1;
                    tracing::warn!(name = %session.name, error = %e, "session skipped this tick");
                }
            }
        }
        if errors > 0 {
            tracing::warn!(errors, "tick completed with per-session errors");
        }

        // 4.-6. Aggregate, merge supervisor stats, assemble snapshot
        let mut snapshot = MonitorSnapshot::new(
            std::process::id(),
            self.config.interval.as_secs_f64(),
            now,
        );
        snapshot.loop_count = self.loop_count;
        snapshot.set_presence(presence);
        snapshot.set_totals(accounting::aggregate_sessions(&views));
        snapshot.merge_supervisor(&load_supervisor_stats(&self.supervisor_stats_file));
        snapshot.sessions = views;

        // 7. Relay push, rate-limited, never blocking beyond the HTTP timeout
        self.maybe_push_to_relay(&mut snapshot, now).await;

        snapshot
    }

    /// Detect, accumulate, sync and heartbeat one session.
    async fn observe_session(
        &mut self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<SessionView, Box<dyn std::error::Error + Send + Sync>> {
        let detection = self.detect(session).await;

        // An operator freeze or a dead window overrides what the pane says
        let mut status = if session.is_asleep {
            AgentStatus::Asleep
        } else if session.status == SessionLifecycle::Terminated
            || session.status == SessionLifecycle::Done
        {
            AgentStatus::Terminated
        } else {
            detection.status
        };
        let mut activity = detection.activity;

        self.accumulate(session, status, now)?;
        self.log_status_change(session, status, activity.as_str(), now);

        if self.sync_due(session, now) {
            if let Err(e) = self.sync_claude_stats(session, now) {
                tracing::warn!(name = %session.name, error = %e, "stats sync failed");
            }
        }

        // Refresh the record before projecting: accumulation and sync both
        // wrote to it.
        let refreshed = self.registry.get_session(&session.id).unwrap_or_else(|| session.clone());

        if self.heartbeat_due(&refreshed, now) {
            match self.send_heartbeat(&refreshed, now).await {
                Ok(()) => {
                    status = AgentStatus::HeartbeatStart;
                    activity = "Heartbeat sent".to_string();
                }
                Err(e) => tracing::warn!(name = %refreshed.name, error = %e, "heartbeat send failed"),
            }
        }

        let refreshed = self.registry.get_session(&session.id).unwrap_or(refreshed);
        Ok(SessionView::project(&refreshed, status, activity, now))
    }

    async fn detect(&self, session: &Session) -> Detection {
        if session.hook_status_detection {
            self.hook.detect(session).await
        } else {
            self.polling.detect(session).await
        }
    }

    /// The accumulation primitive: first observation records the anchor
    /// only; later ones classify the elapsed span and enforce the cap.
    fn accumulate(
        &mut self,
        session: &Session,
        status: AgentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), oc_storage::RegistryError> {
        let previous_status = self.memory.last_status.insert(session.id.clone(), status);
        let anchor = self.memory.last_state_time.insert(session.id.clone(), now);

        let Some(anchor) = anchor else {
            // First observation: anchor only, no accumulation
            self.registry.update_stats(&session.id, |stats| {
                stats.current_state = status;
                stats.state_since = Some(now);
                stats.last_time_accumulation = Some(now);
            })?;
            return Ok(());
        };

        let elapsed = (now - anchor).num_milliseconds() as f64 / 1000.0;
        let result = accounting::accumulate_time(
            status,
            previous_status,
            elapsed,
            session.stats.green_time_seconds,
            session.stats.non_green_time_seconds,
            session.stats.sleep_time_seconds,
            Some(session.start_time),
            now,
        );

        if result.was_capped {
            tracing::debug!(name = %session.name, "accumulated time rescaled to uptime bound");
        }

        let state_since = session.stats.state_since;
        self.registry.update_stats(&session.id, |stats| {
            stats.green_time_seconds = result.green_seconds;
            stats.non_green_time_seconds = result.non_green_seconds;
            stats.sleep_time_seconds = result.sleep_seconds;
            stats.last_time_accumulation = Some(now);
            stats.current_state = status;
            if result.state_changed {
                // Leaving a non-green span records its duration
                if let (Some(previous), Some(since)) = (previous_status, state_since) {
                    if !previous.is_green() && status.is_green() {
                        let span = (now - since).num_milliseconds().max(0) as f64 / 1000.0;
                        stats.push_operation_time(span);
                    }
                }
                stats.state_since = Some(now);
            }
        })?;
        Ok(())
    }

    fn log_status_change(
        &mut self,
        session: &Session,
        status: AgentStatus,
        activity: &str,
        now: DateTime<Utc>,
    ) {
        let changed = self
            .memory
            .last_logged_status
            .insert(session.id.clone(), status)
            .is_none_or(|previous| previous != status);
        if changed {
            if let Err(e) =
                append_agent_status(&self.history_file, now, &session.name, status, activity)
            {
                tracing::warn!(error = %e, "status history append failed");
            }
        }
    }

    fn sync_due(&self, session: &Session, now: DateTime<Utc>) -> bool {
        accounting::should_sync(
            self.memory.last_sync.get(&session.id).copied(),
            now,
            self.config.stats_sync_interval.as_secs_f64(),
        ) && session.start_directory.is_some()
    }

    /// Pull token usage from the runtime's per-project session files.
    fn sync_claude_stats(
        &mut self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<(), oc_storage::RegistryError> {
        self.memory.last_sync.insert(session.id.clone(), now);
        let Some(ref start_directory) = session.start_directory else {
            return Ok(());
        };

        if let Some(current_id) = self.projects.current_session_id(start_directory) {
            self.registry.add_claude_session_id(&session.id, &current_id)?;
        }

        let ids = self
            .registry
            .get_session(&session.id)
            .map(|s| s.claude_session_ids)
            .unwrap_or_default();
        if ids.is_empty() {
            return Ok(());
        }

        let usage = self.projects.usage_for_sessions(start_directory, &ids);
        let cost = accounting::estimate_cost(&usage, &self.config.pricing);
        self.registry.update_stats(&session.id, |stats| {
            stats.interaction_count = usage.interaction_count;
            stats.input_tokens = usage.input_tokens;
            stats.output_tokens = usage.output_tokens;
            stats.cache_creation_tokens = usage.cache_creation_tokens;
            stats.cache_read_tokens = usage.cache_read_tokens;
            stats.estimated_cost_usd = cost;
        })?;
        Ok(())
    }

    /// Enabled, not paused, awake, instruction set, within budget, and due.
    fn heartbeat_due(&self, session: &Session, now: DateTime<Utc>) -> bool {
        if !session.heartbeat_enabled
            || session.heartbeat_paused
            || session.is_asleep
            || session.heartbeat_instruction.trim().is_empty()
        {
            return false;
        }
        if session.budget_exceeded() {
            return false;
        }
        let reference = session.last_heartbeat_time.unwrap_or(session.start_time);
        let elapsed = (now - reference).num_milliseconds() as f64 / 1000.0;
        elapsed >= session.heartbeat_frequency_seconds as f64
    }

    async fn send_heartbeat(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tmux
            .send_keys(
                &session.tmux_session,
                session.tmux_window,
                &session.heartbeat_instruction,
                true,
            )
            .await?;

        self.registry
            .update_session(&session.id, |s| s.last_heartbeat_time = Some(now))?;

        // Timestamp file feeds the time-context hook
        let heartbeat_file = self
            .paths
            .heartbeat_file(&session.tmux_session, &session.name);
        std::fs::write(&heartbeat_file, now.to_rfc3339())?;

        touch_activity_signal(&self.signal_file)?;
        tracing::info!(name = %session.name, "heartbeat sent");
        Ok(())
    }

    async fn maybe_push_to_relay(&mut self, snapshot: &mut MonitorSnapshot, now: DateTime<Utc>) {
        let Some(ref relay) = self.relay else {
            snapshot.relay_enabled = false;
            snapshot.relay_last_status = RelayState::Disabled;
            return;
        };
        snapshot.relay_enabled = true;

        let due = match self.relay_last_push {
            None => true,
            Some(last) => (now - last).num_seconds() >= relay.interval().as_secs() as i64,
        };
        if !due {
            snapshot.relay_last_push = self.relay_last_push;
            snapshot.relay_last_status = self.relay_last_status;
            return;
        }

        self.relay_last_push = Some(now);
        self.relay_last_status = match relay.push(snapshot).await {
            Ok(()) => RelayState::Ok,
            Err(e) => {
                tracing::warn!(error = %e, "relay push failed");
                RelayState::Error
            }
        };
        snapshot.relay_last_push = self.relay_last_push;
        snapshot.relay_last_status = self.relay_last_status;
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
