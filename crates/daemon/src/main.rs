// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overcode Daemon (ocd)
//!
//! Hosts the monitor or supervisor loop for one tmux session. Typically
//! started by the `oc` CLI; not meant to be invoked directly.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use oc_adapters::TmuxCli;
use oc_core::clock::SystemClock;
use oc_core::paths::OvercodePaths;
use oc_daemon::logging::{rotate_log_if_needed, setup_logging};
use oc_daemon::monitor::{MonitorConfig, MonitorDaemon};
use oc_daemon::presence::NoopPresence;
use oc_daemon::supervisor::{SupervisorConfig, SupervisorDaemon};
use oc_daemon::{pidfile, signals};
use oc_storage::SessionRegistry;

enum Role {
    Monitor,
    Supervisor,
}

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let role = match args.next().as_deref() {
        Some("monitor") => Role::Monitor,
        Some("supervisor") => Role::Supervisor,
        Some("--version") | Some("-V") | Some("-v") => {
            println!("ocd {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Some("--help") | Some("-h") | None => {
            print_help();
            return;
        }
        Some(other) => {
            eprintln!("error: unknown role '{other}'");
            eprintln!("Usage: ocd <monitor|supervisor> <tmux-session>");
            std::process::exit(1);
        }
    };

    let Some(tmux_session) = args.next() else {
        eprintln!("error: missing tmux session name");
        eprintln!("Usage: ocd <monitor|supervisor> <tmux-session>");
        std::process::exit(1);
    };
    if let Err(e) = oc_core::name::validate_name(&tmux_session) {
        eprintln!("error: invalid tmux session name: {e}");
        std::process::exit(1);
    }

    let paths = OvercodePaths::from_env();
    if let Err(e) = paths.ensure_session_dir(&tmux_session) {
        eprintln!("error: cannot create state directory: {e}");
        std::process::exit(2);
    }

    let (pid_path, log_path) = match role {
        Role::Monitor => (
            paths.monitor_pid_file(&tmux_session),
            paths.monitor_log_file(&tmux_session),
        ),
        Role::Supervisor => (
            paths.supervisor_pid_file(&tmux_session),
            paths.supervisor_log_file(&tmux_session),
        ),
    };

    rotate_log_if_needed(&log_path);
    let log_guard = match setup_logging(&log_path) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: logging setup failed: {e}");
            std::process::exit(2);
        }
    };

    // NOTE(lifetime): held to keep the exclusive pid-file lock
    let _pid_lock = match pidfile::acquire(&pid_path) {
        Ok(Some(lock)) => lock,
        Ok(None) => {
            let pid = pidfile::read_pid(&pid_path)
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            eprintln!("ocd is already running for '{tmux_session}' (pid: {pid})");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: cannot acquire pid file: {e}");
            std::process::exit(2);
        }
    };

    let registry = match SessionRegistry::new(&paths, &tmux_session) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: cannot open registry: {e}");
            std::process::exit(2);
        }
    };
    let tmux = TmuxCli::from_env();
    if !tmux.check_available().await {
        eprintln!("error: tmux is not available on PATH");
        std::process::exit(2);
    }

    // Signal ready for the parent process waiting on startup
    println!("READY");

    match role {
        Role::Monitor => {
            let mut daemon = MonitorDaemon::new(
                MonitorConfig::new(&tmux_session),
                paths,
                registry,
                tmux,
                SystemClock,
                NoopPresence,
            )
            .with_relay_from_env();
            install_handlers(daemon.shutdown_handle());
            daemon.run().await;
        }
        Role::Supervisor => {
            let mut daemon = SupervisorDaemon::new(
                SupervisorConfig::new(&tmux_session),
                &paths,
                registry,
                tmux,
                SystemClock,
            );
            install_handlers(daemon.shutdown_handle());
            daemon.run().await;
        }
    }

    let _ = std::fs::remove_file(&pid_path);
    drop(log_guard);
}

fn install_handlers(shutdown: signals::Shutdown) {
    if let Err(e) = shutdown.install_handlers() {
        tracing::warn!(error = %e, "signal handlers unavailable");
    }
}

fn print_help() {
    println!("ocd {}", env!("CARGO_PKG_VERSION"));
    println!("Overcode daemon - monitor and supervisor loops for one tmux session");
    println!();
    println!("USAGE:");
    println!("    ocd monitor <tmux-session>");
    println!("    ocd supervisor <tmux-session>");
    println!();
    println!("The daemon is typically started by the `oc` CLI and should not");
    println!("be invoked directly. State lives under ~/.overcode/sessions/.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}
