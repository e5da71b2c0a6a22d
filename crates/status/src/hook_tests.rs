// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oc_adapters::FakeTmuxAdapter;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

fn write_hook_state(dir: &Path, name: &str, event: &str, timestamp: f64, tool: Option<&str>) {
    std::fs::create_dir_all(dir).unwrap();
    let mut state = serde_json::json!({"event": event, "timestamp": timestamp});
    if let Some(tool) = tool {
        state["tool_name"] = serde_json::json!(tool);
    }
    std::fs::write(
        dir.join(format!("hook_state_{name}.json")),
        state.to_string(),
    )
    .unwrap();
}

fn session_named(name: &str, window: u32) -> Session {
    Session::new(
        name,
        "agents",
        window,
        vec!["claude".to_string(), "code".to_string()],
        chrono::Utc::now(),
    )
}

struct Fixture {
    detector: HookDetector<FakeTmuxAdapter>,
    tmux: FakeTmuxAdapter,
    state_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

fn fixture(pane_content: &str) -> (Fixture, Session) {
    let tmp = tempfile::tempdir().unwrap();
    let state_dir = tmp.path().join("agents");
    let tmux = FakeTmuxAdapter::new();
    tmux.add_session("agents");
    let window = tmux.add_window("agents", "test-agent");
    if !pane_content.is_empty() {
        tmux.set_pane_content("agents", window, pane_content);
    }
    let detector = HookDetector::new("agents", tmux.clone(), &state_dir);
    (
        Fixture {
            detector,
            tmux,
            state_dir,
            _tmp: tmp,
        },
        session_named("test-agent", window),
    )
}

mod state_reading {
    use super::*;

    #[tokio::test]
    async fn valid_state_is_used() {
        let (fx, session) = fixture("some pane content");
        write_hook_state(&fx.state_dir, "test-agent", "UserPromptSubmit", epoch_now(), None);

        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::Running);
        assert!(detection.activity.contains("Processing prompt"));
    }

    #[tokio::test]
    async fn corrupt_json_falls_back_to_polling() {
        let (fx, session) = fixture("⏺ Finished work.\n\n>\n  ? for shortcuts");
        std::fs::create_dir_all(&fx.state_dir).unwrap();
        std::fs::write(
            fx.state_dir.join("hook_state_test-agent.json"),
            "{invalid json!!!",
        )
        .unwrap();

        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }

    #[tokio::test]
    async fn missing_timestamp_falls_back() {
        let (fx, session) = fixture("⏺ Finished work.\n\n>\n  ? for shortcuts");
        std::fs::create_dir_all(&fx.state_dir).unwrap();
        std::fs::write(
            fx.state_dir.join("hook_state_test-agent.json"),
            serde_json::json!({"event": "Stop"}).to_string(),
        )
        .unwrap();

        // Stop would map to waiting_user anyway; use a Running-mapping pane
        // to prove polling ran: the empty prompt wins.
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
        assert!(detection.activity.contains("Waiting for user input"));
    }

    #[tokio::test]
    async fn non_object_json_falls_back() {
        let (fx, session) = fixture("⏺ Finished work.\n\n>\n  ? for shortcuts");
        std::fs::create_dir_all(&fx.state_dir).unwrap();
        std::fs::write(fx.state_dir.join("hook_state_test-agent.json"), "[1, 2, 3]").unwrap();

        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }

    #[tokio::test]
    async fn non_numeric_timestamp_falls_back() {
        let (fx, session) = fixture("⏺ Finished work.\n\n>\n  ? for shortcuts");
        std::fs::create_dir_all(&fx.state_dir).unwrap();
        std::fs::write(
            fx.state_dir.join("hook_state_test-agent.json"),
            serde_json::json!({"event": "UserPromptSubmit", "timestamp": "not-a-number"})
                .to_string(),
        )
        .unwrap();

        let detection = fx.detector.detect(&session).await;
        assert_ne!(detection.activity, "Processing prompt");
    }
}

mod staleness {
    use super::*;

    #[tokio::test]
    async fn fresh_state_is_honored() {
        let (fx, session) = fixture("content");
        write_hook_state(&fx.state_dir, "test-agent", "UserPromptSubmit", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::Running);
    }

    #[tokio::test]
    async fn stale_state_falls_back_to_polling() {
        let (fx, session) = fixture("⏺ Finished work.\n\n>\n  ? for shortcuts");
        write_hook_state(
            &fx.state_dir,
            "test-agent",
            "UserPromptSubmit",
            epoch_now() - 200.0,
            None,
        );

        let detection = fx.detector.detect(&session).await;
        // Polling sees the empty prompt, not the stale Running event
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }

    #[tokio::test]
    async fn custom_threshold_is_respected() {
        let (fx, session) = fixture("⏺ Finished work.\n\n>\n  ? for shortcuts");
        let detector = fx.detector.with_stale_threshold(3.0);
        write_hook_state(
            &fx.state_dir,
            "test-agent",
            "UserPromptSubmit",
            epoch_now() - 5.0,
            None,
        );

        let detection = detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }
}

mod event_mapping {
    use super::*;

    #[tokio::test]
    async fn user_prompt_submit_is_running() {
        let (fx, session) = fixture("pane");
        write_hook_state(&fx.state_dir, "test-agent", "UserPromptSubmit", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::Running);
        assert_eq!(detection.activity, "Processing prompt");
    }

    #[tokio::test]
    async fn post_tool_use_names_the_tool() {
        let (fx, session) = fixture("pane");
        write_hook_state(&fx.state_dir, "test-agent", "PostToolUse", epoch_now(), Some("Read"));
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::Running);
        assert_eq!(detection.activity, "Using Read");
    }

    #[tokio::test]
    async fn post_tool_use_without_tool_name() {
        let (fx, session) = fixture("pane");
        write_hook_state(&fx.state_dir, "test-agent", "PostToolUse", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::Running);
        assert_eq!(detection.activity, "Using tool");
    }

    #[tokio::test]
    async fn stop_on_root_session_is_waiting_user() {
        let (fx, session) = fixture("pane");
        write_hook_state(&fx.state_dir, "test-agent", "Stop", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }

    #[tokio::test]
    async fn stop_on_child_session_is_waiting_oversight() {
        let (fx, mut session) = fixture("pane");
        session.parent_session_id = Some("parent-id".to_string());
        write_hook_state(&fx.state_dir, "test-agent", "Stop", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingOversight);
        assert!(detection.activity.contains("oversight"));
    }

    #[tokio::test]
    async fn permission_request_is_waiting_user() {
        let (fx, session) = fixture("pane");
        write_hook_state(&fx.state_dir, "test-agent", "PermissionRequest", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
        assert!(detection.activity.contains("Permission"));
    }

    #[tokio::test]
    async fn session_end_with_shell_prompt_is_terminated() {
        let (fx, session) = fixture("\nmike@mac ~/Code/overcode %\n");
        write_hook_state(&fx.state_dir, "test-agent", "SessionEnd", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::Terminated);
    }

    #[tokio::test]
    async fn session_end_terminated_despite_claude_output_above() {
        let pane = "⏺ Here's my final response:\n\n  The task is complete.\n\nmike@mac ~/Code/overcode %";
        let (fx, session) = fixture(pane);
        write_hook_state(&fx.state_dir, "test-agent", "SessionEnd", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::Terminated);
    }

    #[tokio::test]
    async fn session_end_after_clear_is_waiting_user() {
        let pane = "╭──────────────────────────╮\n│ ✻ Welcome to Claude Code! │\n╰──────────────────────────╯\n\n>\n  ? for shortcuts";
        let (fx, session) = fixture(pane);
        write_hook_state(&fx.state_dir, "test-agent", "SessionEnd", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }

    #[tokio::test]
    async fn unknown_event_defaults_to_waiting_user() {
        let (fx, session) = fixture("pane");
        write_hook_state(&fx.state_dir, "test-agent", "SomeNewEvent", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }
}

mod fallback_and_pane {
    use super::*;

    #[tokio::test]
    async fn no_state_file_falls_back_to_polling() {
        let (fx, session) = fixture("⏺ Finished work.\n\n>\n  ? for shortcuts");
        std::fs::create_dir_all(&fx.state_dir).unwrap();
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
    }

    #[tokio::test]
    async fn pane_text_is_returned_alongside_hook_status() {
        let (fx, session) = fixture("some pane content here");
        write_hook_state(&fx.state_dir, "test-agent", "UserPromptSubmit", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert!(detection.pane.contains("some pane content here"));
    }

    #[tokio::test]
    async fn missing_pane_yields_empty_pane_text() {
        let (fx, session) = fixture("");
        write_hook_state(&fx.state_dir, "test-agent", "Stop", epoch_now(), None);
        let detection = fx.detector.detect(&session).await;
        assert_eq!(detection.status, AgentStatus::WaitingUser);
        assert_eq!(detection.pane, "");
    }

    #[tokio::test]
    async fn pane_content_delegates_to_polling() {
        let (fx, session) = fixture("line1\nline2\nline3");
        let content = fx.detector.pane_content(session.tmux_window, 10).await.unwrap();
        assert!(content.contains("line1"));
        let _ = &fx.tmux;
    }
}
