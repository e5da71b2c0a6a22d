// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations: construct the core objects, call one
//! operation, render the result, map errors to exit codes.

use crate::{EXIT_OK, EXIT_OPERATIONAL, EXIT_USER_ERROR};
use oc_adapters::TmuxCli;
use oc_core::paths::{OvercodePaths, ENV_TMUX_SESSION};
use oc_core::snapshot::MonitorSnapshot;
use oc_daemon::pidfile;
use oc_launcher::{Launcher, LauncherError, LaunchSpec};
use oc_storage::{read_json, SessionRegistry};

/// The tmux session scope this invocation operates on.
fn tmux_session() -> String {
    std::env::var(ENV_TMUX_SESSION).unwrap_or_else(|_| "agents".to_string())
}

fn build_launcher() -> Result<Launcher<TmuxCli>, i32> {
    let paths = OvercodePaths::from_env();
    let scope = tmux_session();
    let registry = match SessionRegistry::new(&paths, &scope) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: cannot open registry: {e}");
            return Err(EXIT_OPERATIONAL);
        }
    };
    let launcher = Launcher::new(scope, TmuxCli::from_env(), registry);
    if let Err(e) = launcher.ensure_dependencies() {
        eprintln!("error: {e}");
        return Err(EXIT_OPERATIONAL);
    }
    Ok(launcher)
}

fn exit_code_for(error: &LauncherError) -> i32 {
    match error {
        LauncherError::NotFound(_) | LauncherError::InvalidName(_) => EXIT_USER_ERROR,
        LauncherError::Registry(oc_storage::RegistryError::DuplicateName(_))
        | LauncherError::Registry(oc_storage::RegistryError::DepthExceeded(_))
        | LauncherError::Registry(oc_storage::RegistryError::ParentNotFound(_)) => EXIT_USER_ERROR,
        _ => EXIT_OPERATIONAL,
    }
}

pub async fn launch(spec: LaunchSpec) -> i32 {
    let launcher = match build_launcher() {
        Ok(launcher) => launcher,
        Err(code) => return code,
    };
    match launcher.launch(spec).await {
        Ok(session) => {
            println!(
                "launched '{}' in window {} (id {})",
                session.name, session.tmux_window, session.id
            );
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

pub async fn send(name: &str, text: &str, enter: bool) -> i32 {
    let launcher = match build_launcher() {
        Ok(launcher) => launcher,
        Err(code) => return code,
    };
    match launcher.send_to_session(name, text, enter).await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

pub async fn kill(name: &str, cascade: bool) -> i32 {
    let launcher = match build_launcher() {
        Ok(launcher) => launcher,
        Err(code) => return code,
    };
    match launcher.kill_session(name, cascade).await {
        Ok(removed) => {
            println!("killed {removed} session(s)");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

pub async fn restart(name: &str) -> i32 {
    let launcher = match build_launcher() {
        Ok(launcher) => launcher,
        Err(code) => return code,
    };
    match launcher.restart_session(name).await {
        Ok(()) => {
            println!("restarted '{name}'");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

pub async fn list(kill_untracked: bool) -> i32 {
    let launcher = match build_launcher() {
        Ok(launcher) => launcher,
        Err(code) => return code,
    };
    match launcher.list_sessions(kill_untracked).await {
        Ok(sessions) => {
            if sessions.is_empty() {
                println!("no sessions");
                return EXIT_OK;
            }
            for session in sessions {
                println!(
                    "{:<20} window {:<3} {:<12} {}",
                    session.name,
                    session.tmux_window,
                    format!("{:?}", session.status).to_lowercase(),
                    session.stats.current_state,
                );
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

pub fn status() -> i32 {
    let paths = OvercodePaths::from_env();
    let scope = tmux_session();
    let state_file = paths.monitor_state_file(&scope);
    match read_json::<MonitorSnapshot>(&state_file) {
        Ok(Some(snapshot)) => {
            println!(
                "monitor pid {} loop {} ({} sessions, {} green, {:.0}s green total)",
                snapshot.pid,
                snapshot.loop_count,
                snapshot.sessions.len(),
                snapshot.green_count,
                snapshot.total_green_seconds,
            );
            for view in &snapshot.sessions {
                println!(
                    "{:<20} {:<18} {}",
                    view.name, view.current_status.as_str(), view.current_activity
                );
            }
            EXIT_OK
        }
        Ok(None) => {
            println!("monitor daemon has not published state for '{scope}'");
            EXIT_USER_ERROR
        }
        Err(e) => {
            eprintln!("error: unreadable monitor state: {e}");
            EXIT_OPERATIONAL
        }
    }
}

pub async fn cleanup(include_done: bool) -> i32 {
    let launcher = match build_launcher() {
        Ok(launcher) => launcher,
        Err(code) => return code,
    };
    match launcher.cleanup_terminated(include_done).await {
        Ok(archived) => {
            println!("archived {archived} session(s)");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

fn daemon_pid_path(role: &str) -> std::path::PathBuf {
    let paths = OvercodePaths::from_env();
    let scope = tmux_session();
    match role {
        "supervisor" => paths.supervisor_pid_file(&scope),
        _ => paths.monitor_pid_file(&scope),
    }
}

pub fn daemon_start(role: &str) -> i32 {
    let pid_path = daemon_pid_path(role);
    if pidfile::is_running(&pid_path) {
        println!("{role} daemon already running (pid {:?})", pidfile::read_pid(&pid_path));
        return EXIT_OK;
    }

    let scope = tmux_session();
    match std::process::Command::new("ocd")
        .arg(role)
        .arg(&scope)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
    {
        Ok(child) => {
            println!("{role} daemon starting for '{scope}' (pid {})", child.id());
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: cannot start ocd: {e}");
            EXIT_OPERATIONAL
        }
    }
}

pub fn daemon_stop(role: &str) -> i32 {
    let pid_path = daemon_pid_path(role);
    if pidfile::stop(&pid_path) {
        println!("{role} daemon stopped");
        EXIT_OK
    } else {
        println!("{role} daemon was not running");
        EXIT_OK
    }
}

pub fn daemon_status() -> i32 {
    for role in ["monitor", "supervisor"] {
        let running = pidfile::is_running(&daemon_pid_path(role));
        println!(
            "{role}: {}",
            if running { "running" } else { "stopped" }
        );
    }
    EXIT_OK
}
