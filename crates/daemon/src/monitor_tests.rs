// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::presence::{FixedPresence, NoopPresence};
use chrono::TimeZone;
use oc_adapters::{FakeTmuxAdapter, TmuxCall};
use oc_core::clock::FakeClock;
use oc_core::snapshot::PresenceSample;
use oc_core::supervisor::SupervisorStats;
use oc_storage::save_supervisor_stats;

const PANE_IDLE_PROMPT: &str = "⏺ Finished work.\n\n>\n  ? for shortcuts";
const PANE_SPINNER: &str = "⏺ Working on it.\n\n✻ Churning… (esc to interrupt)";

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

struct Fixture {
    daemon: MonitorDaemon<FakeTmuxAdapter, FakeClock, NoopPresence>,
    registry: SessionRegistry,
    tmux: FakeTmuxAdapter,
    clock: FakeClock,
    paths: OvercodePaths,
    _tmp: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let paths = OvercodePaths::with_base(tmp.path());
    let registry = SessionRegistry::new(&paths, "agents").unwrap();
    let tmux = FakeTmuxAdapter::new();
    tmux.add_session("agents");
    let clock = FakeClock::new(start_time());
    let daemon = MonitorDaemon::new(
        MonitorConfig::new("agents"),
        paths.clone(),
        registry.clone(),
        tmux.clone(),
        clock.clone(),
        NoopPresence,
    );
    Fixture {
        daemon,
        registry,
        tmux,
        clock,
        paths,
        _tmp: tmp,
    }
}

fn spawn_agent(fx: &Fixture, name: &str, pane: &str) -> Session {
    let window = fx.tmux.add_window("agents", name);
    fx.tmux.set_pane_content("agents", window, pane);
    let session = Session::new(
        name,
        "agents",
        window,
        vec!["claude".to_string(), "code".to_string()],
        fx.clock.now(),
    );
    fx.registry.create_session(session).unwrap()
}

mod accumulation {
    use super::*;

    #[tokio::test]
    async fn first_observation_does_not_accumulate() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);

        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.stats.green_time_seconds, 0.0);
        assert_eq!(loaded.stats.non_green_time_seconds, 0.0);
        assert!(loaded.stats.last_time_accumulation.is_some());
    }

    #[tokio::test]
    async fn non_green_status_accumulates_non_green_time() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);

        fx.daemon.tick().await;
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.stats.green_time_seconds, 0.0);
        assert!((loaded.stats.non_green_time_seconds - 10.0).abs() < 0.5);
    }

    #[tokio::test]
    async fn green_status_accumulates_green_time() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "alpha", PANE_SPINNER);

        fx.daemon.tick().await;
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert!((loaded.stats.green_time_seconds - 10.0).abs() < 0.5);
        assert_eq!(loaded.stats.non_green_time_seconds, 0.0);
    }

    #[tokio::test]
    async fn asleep_session_accumulates_sleep_only() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "gamma", PANE_IDLE_PROMPT);

        // Establish some non-green time first
        fx.daemon.tick().await;
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;
        let before = fx.registry.get_session(&session.id).unwrap();
        let non_green_before = before.stats.non_green_time_seconds;
        assert!(non_green_before > 0.0);

        fx.registry
            .update_session(&session.id, |s| s.is_asleep = true)
            .unwrap();

        fx.clock.advance_secs(30);
        fx.daemon.tick().await;
        fx.clock.advance_secs(30);
        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.stats.non_green_time_seconds, non_green_before);
        assert_eq!(loaded.stats.green_time_seconds, before.stats.green_time_seconds);
        assert!((loaded.stats.sleep_time_seconds - 60.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn state_transition_updates_state_since_and_operation_times() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);

        fx.daemon.tick().await; // waiting_user
        fx.clock.advance_secs(20);
        fx.daemon.tick().await; // still waiting

        // Agent springs to life
        fx.tmux
            .set_pane_content("agents", session.tmux_window, PANE_SPINNER);
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.stats.current_state, AgentStatus::Running);
        assert_eq!(loaded.stats.state_since, Some(fx.clock.now()));
        // The non-green span was recorded as an operation time
        assert_eq!(loaded.stats.operation_times.len(), 1);
        assert!((loaded.stats.operation_times[0] - 30.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn accumulated_time_capped_at_uptime_bound() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "alpha", PANE_SPINNER);
        // Corrupt counters way beyond uptime
        fx.registry
            .update_stats(&session.id, |stats| stats.green_time_seconds = 10_000.0)
            .unwrap();

        fx.daemon.tick().await;
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        let uptime = loaded.uptime_seconds(fx.clock.now());
        let total = loaded.stats.green_time_seconds
            + loaded.stats.non_green_time_seconds
            + loaded.stats.sleep_time_seconds;
        assert!(total <= uptime * 1.1 + 0.001);
    }

    #[tokio::test]
    async fn sessions_outside_scope_are_ignored() {
        let mut fx = fixture();
        let mut foreign = Session::new(
            "foreign",
            "other-tmux",
            1,
            vec!["claude".to_string()],
            fx.clock.now(),
        );
        foreign.tmux_session = "other-tmux".to_string();
        let foreign = fx.registry.create_session(foreign).unwrap();

        let snapshot = fx.daemon.tick().await;
        assert!(snapshot.sessions.is_empty());

        let loaded = fx.registry.get_session(&foreign.id).unwrap();
        assert!(loaded.stats.last_time_accumulation.is_none());
    }
}

mod heartbeats {
    use super::*;

    fn heartbeat_agent(fx: &Fixture, name: &str) -> Session {
        let session = spawn_agent(fx, name, PANE_IDLE_PROMPT);
        fx.registry
            .update_session(&session.id, |s| {
                s.heartbeat_enabled = true;
                s.heartbeat_frequency_seconds = 30;
                s.heartbeat_instruction = "continue".to_string();
            })
            .unwrap()
    }

    fn heartbeat_sends(tmux: &FakeTmuxAdapter) -> usize {
        tmux.sent_keys()
            .iter()
            .filter(|c| matches!(c, TmuxCall::SendKeys { text, enter: true, .. } if text == "continue"))
            .count()
    }

    #[tokio::test]
    async fn sends_heartbeat_when_due() {
        let mut fx = fixture();
        let session = heartbeat_agent(&fx, "beta");

        fx.clock.advance_secs(35);
        fx.daemon.tick().await;

        assert_eq!(heartbeat_sends(&fx.tmux), 1);
        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.last_heartbeat_time, Some(fx.clock.now()));

        // Timestamp file for the time-context hook
        let heartbeat_file = fx.paths.heartbeat_file("agents", "beta");
        assert!(heartbeat_file.exists());
        // Activity signal woke the sleepers
        assert!(fx.paths.activity_signal_file("agents").exists());
    }

    #[tokio::test]
    async fn does_not_send_before_interval() {
        let mut fx = fixture();
        heartbeat_agent(&fx, "beta");

        fx.clock.advance_secs(10);
        fx.daemon.tick().await;
        assert_eq!(heartbeat_sends(&fx.tmux), 0);
    }

    #[tokio::test]
    async fn exactly_one_heartbeat_not_repeated_immediately() {
        let mut fx = fixture();
        heartbeat_agent(&fx, "beta");

        fx.clock.advance_secs(35);
        fx.daemon.tick().await;
        fx.clock.advance_secs(5);
        fx.daemon.tick().await;

        assert_eq!(heartbeat_sends(&fx.tmux), 1);
    }

    #[tokio::test]
    async fn paused_heartbeat_never_fires() {
        let mut fx = fixture();
        let session = heartbeat_agent(&fx, "beta");
        fx.registry
            .update_session(&session.id, |s| s.heartbeat_paused = true)
            .unwrap();

        fx.clock.advance_secs(300);
        fx.daemon.tick().await;

        assert_eq!(heartbeat_sends(&fx.tmux), 0);
        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.last_heartbeat_time, None);
    }

    #[tokio::test]
    async fn asleep_session_gets_no_heartbeat() {
        let mut fx = fixture();
        let session = heartbeat_agent(&fx, "beta");
        fx.registry
            .update_session(&session.id, |s| s.is_asleep = true)
            .unwrap();

        fx.clock.advance_secs(300);
        fx.daemon.tick().await;
        assert_eq!(heartbeat_sends(&fx.tmux), 0);
    }

    #[tokio::test]
    async fn empty_instruction_gets_no_heartbeat() {
        let mut fx = fixture();
        let session = heartbeat_agent(&fx, "beta");
        fx.registry
            .update_session(&session.id, |s| s.heartbeat_instruction = String::new())
            .unwrap();

        fx.clock.advance_secs(300);
        fx.daemon.tick().await;
        assert_eq!(heartbeat_sends(&fx.tmux), 0);
    }

    #[tokio::test]
    async fn disabled_heartbeat_never_fires() {
        let mut fx = fixture();
        let session = heartbeat_agent(&fx, "beta");
        fx.registry
            .update_session(&session.id, |s| s.heartbeat_enabled = false)
            .unwrap();

        fx.clock.advance_secs(300);
        fx.daemon.tick().await;
        assert_eq!(heartbeat_sends(&fx.tmux), 0);
    }

    #[tokio::test]
    async fn budget_exceeded_suppresses_heartbeat() {
        let mut fx = fixture();
        let session = heartbeat_agent(&fx, "delta");
        fx.registry
            .update_session(&session.id, |s| s.cost_budget_usd = 0.01)
            .unwrap();
        fx.registry
            .update_stats(&session.id, |stats| stats.estimated_cost_usd = 0.02)
            .unwrap();

        fx.clock.advance_secs(300);
        fx.daemon.tick().await;

        assert_eq!(heartbeat_sends(&fx.tmux), 0);
        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.last_heartbeat_time, None);
    }

    #[tokio::test]
    async fn first_heartbeat_measured_from_start_time() {
        let mut fx = fixture();
        heartbeat_agent(&fx, "beta");

        // 29s after start: not yet due; 31s: due
        fx.clock.advance_secs(29);
        fx.daemon.tick().await;
        assert_eq!(heartbeat_sends(&fx.tmux), 0);

        fx.clock.advance_secs(2);
        fx.daemon.tick().await;
        assert_eq!(heartbeat_sends(&fx.tmux), 1);
    }

    #[tokio::test]
    async fn heartbeat_tick_reports_heartbeat_start_status() {
        let mut fx = fixture();
        heartbeat_agent(&fx, "beta");

        fx.clock.advance_secs(35);
        let snapshot = fx.daemon.tick().await;

        assert_eq!(
            snapshot.sessions[0].current_status,
            AgentStatus::HeartbeatStart
        );
        // heartbeat_start is green, so the aggregate counts it
        assert_eq!(snapshot.green_count, 1);
    }
}

mod snapshot {
    use super::*;

    #[tokio::test]
    async fn tick_publishes_loop_and_sessions() {
        let mut fx = fixture();
        spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);
        spawn_agent(&fx, "busy", PANE_SPINNER);

        fx.daemon.tick().await;
        fx.clock.advance_secs(10);
        let snapshot = fx.daemon.tick().await;

        assert_eq!(snapshot.loop_count, 2);
        assert_eq!(snapshot.pid, std::process::id());
        assert_eq!(snapshot.sessions.len(), 2);
        assert_eq!(snapshot.green_count, 1);
        assert_eq!(snapshot.active_count, 2);
        assert_eq!(snapshot.current_interval, 10.0);
        assert_eq!(snapshot.relay_last_status, RelayState::Disabled);
    }

    #[tokio::test]
    async fn run_writes_state_file() {
        let fx = fixture();
        spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);
        let mut daemon = fx.daemon;
        let shutdown = daemon.shutdown_handle();

        let handle = tokio::spawn(async move { daemon.run().await });
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.trigger();
        handle.await.unwrap();

        let state_file = fx.paths.monitor_state_file("agents");
        let raw = std::fs::read_to_string(state_file).unwrap();
        let loaded: MonitorSnapshot = serde_json::from_str(&raw).unwrap();
        assert!(loaded.loop_count >= 1);
        assert_eq!(loaded.sessions.len(), 1);
    }

    #[tokio::test]
    async fn supervisor_stats_merged_when_present() {
        let mut fx = fixture();
        let mut stats = SupervisorStats::default();
        stats.supervisor_launches = 4;
        stats.supervisor_total_tokens = 1234;
        save_supervisor_stats(&fx.paths.supervisor_stats_file("agents"), &stats).unwrap();

        let snapshot = fx.daemon.tick().await;
        assert_eq!(snapshot.supervisor_launches, 4);
        assert_eq!(snapshot.supervisor_total_tokens, 1234);
    }

    #[tokio::test]
    async fn missing_supervisor_stats_is_fine() {
        let mut fx = fixture();
        let snapshot = fx.daemon.tick().await;
        assert_eq!(snapshot.supervisor_launches, 0);
    }

    #[tokio::test]
    async fn presence_sample_lands_in_snapshot_and_log() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = OvercodePaths::with_base(tmp.path());
        let registry = SessionRegistry::new(&paths, "agents").unwrap();
        let tmux = FakeTmuxAdapter::new();
        tmux.add_session("agents");
        let mut daemon = MonitorDaemon::new(
            MonitorConfig::new("agents"),
            paths.clone(),
            registry,
            tmux,
            FakeClock::new(start_time()),
            FixedPresence(PresenceSample {
                state: 3,
                idle_seconds: 1.5,
            }),
        );

        let snapshot = daemon.tick().await;
        assert_eq!(snapshot.presence_state, Some(3));
        assert!(snapshot.presence_available);
        assert!(paths.presence_log_file("agents").exists());
    }

    #[tokio::test]
    async fn status_changes_append_to_history() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);

        fx.daemon.tick().await;
        fx.tmux
            .set_pane_content("agents", session.tmux_window, PANE_SPINNER);
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;
        // No change this tick
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;

        let rows = oc_storage::read_agent_status_history(
            &fx.paths.agent_history_file("agents"),
            None,
            Some("alpha"),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, AgentStatus::WaitingUser);
        assert_eq!(rows[1].status, AgentStatus::Running);
    }
}

mod stats_sync {
    use super::*;
    use std::io::Write;

    fn write_transcript(projects: &ClaudeProjects, project: &std::path::Path, id: &str, input: u64, output: u64) {
        let dir = projects.project_dir(project);
        std::fs::create_dir_all(&dir).unwrap();
        let mut file = std::fs::File::create(dir.join(format!("{id}.jsonl"))).unwrap();
        writeln!(
            file,
            "{}",
            serde_json::json!({
                "message": {"usage": {
                    "input_tokens": input,
                    "output_tokens": output,
                    "cache_creation_input_tokens": 0,
                    "cache_read_input_tokens": 0,
                }}
            })
        )
        .unwrap();
    }

    #[tokio::test]
    async fn discovers_session_id_and_sums_tokens() {
        let mut fx = fixture();
        let transcripts = tempfile::tempdir().unwrap();
        let projects = ClaudeProjects::new(transcripts.path());
        let project_dir = tempfile::tempdir().unwrap();

        write_transcript(&projects, project_dir.path(), "claude-sess-abc", 5000, 2000);
        fx.daemon = fx.daemon.with_projects(projects);

        let session = spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);
        fx.registry
            .update_session(&session.id, |s| {
                s.start_directory = Some(project_dir.path().to_path_buf())
            })
            .unwrap();

        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(loaded.claude_session_ids, vec!["claude-sess-abc"]);
        assert_eq!(loaded.stats.input_tokens, 5000);
        assert_eq!(loaded.stats.output_tokens, 2000);
        assert_eq!(loaded.stats.total_tokens, 7000);
        // 5000 * 15/M + 2000 * 75/M
        assert!((loaded.stats.estimated_cost_usd - 0.225).abs() < 1e-9);
    }

    #[tokio::test]
    async fn sync_respects_the_per_session_interval() {
        let mut fx = fixture();
        let transcripts = tempfile::tempdir().unwrap();
        let projects = ClaudeProjects::new(transcripts.path());
        let project_dir = tempfile::tempdir().unwrap();

        write_transcript(&projects, project_dir.path(), "sess-1", 100, 0);
        fx.daemon = fx.daemon.with_projects(projects.clone());

        let session = spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);
        fx.registry
            .update_session(&session.id, |s| {
                s.start_directory = Some(project_dir.path().to_path_buf())
            })
            .unwrap();

        fx.daemon.tick().await;

        // More tokens appear immediately, but the next sync is not due yet
        write_transcript(&projects, project_dir.path(), "sess-1", 100, 50);
        fx.clock.advance_secs(10);
        fx.daemon.tick().await;
        let mid = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(mid.stats.output_tokens, 0);

        // After the 60s interval the new numbers land
        fx.clock.advance_secs(60);
        fx.daemon.tick().await;
        let late = fx.registry.get_session(&session.id).unwrap();
        assert_eq!(late.stats.output_tokens, 50);
    }

    #[tokio::test]
    async fn session_without_start_directory_is_skipped() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "alpha", PANE_IDLE_PROMPT);

        fx.daemon.tick().await;

        let loaded = fx.registry.get_session(&session.id).unwrap();
        assert!(loaded.claude_session_ids.is_empty());
        assert_eq!(loaded.stats.total_tokens, 0);
    }
}

mod hook_path {
    use super::*;

    #[tokio::test]
    async fn hook_flag_routes_through_hook_detector() {
        let mut fx = fixture();
        let session = spawn_agent(&fx, "eps", "irrelevant pane text");
        fx.registry
            .update_session(&session.id, |s| s.hook_status_detection = true)
            .unwrap();

        let state_dir = fx.paths.session_dir("agents");
        std::fs::create_dir_all(&state_dir).unwrap();
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        std::fs::write(
            state_dir.join("hook_state_eps.json"),
            serde_json::json!({"event": "UserPromptSubmit", "timestamp": timestamp}).to_string(),
        )
        .unwrap();

        let snapshot = fx.daemon.tick().await;
        assert_eq!(snapshot.sessions[0].current_status, AgentStatus::Running);
        assert!(snapshot.sessions[0].current_activity.contains("Processing prompt"));
    }
}
