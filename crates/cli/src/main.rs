// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oc: Overcode operator CLI
//!
//! A thin wrapper over the core crates; the interesting behavior lives in
//! oc-launcher and oc-daemon. Exit codes: 0 success, 1 user error,
//! 2 operational failure, 130 interrupted.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod args;
mod commands;
mod hook_handler;

use args::Parsed;

const EXIT_OK: i32 = 0;
const EXIT_USER_ERROR: i32 = 1;
const EXIT_OPERATIONAL: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match args::parse(&raw) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("Run `oc --help` for usage.");
            std::process::exit(EXIT_USER_ERROR);
        }
    };

    let code = tokio::select! {
        code = dispatch(parsed) => code,
        _ = tokio::signal::ctrl_c() => EXIT_INTERRUPTED,
    };
    std::process::exit(code);
}

async fn dispatch(parsed: Parsed) -> i32 {
    match parsed {
        Parsed::Help => {
            print_help();
            EXIT_OK
        }
        Parsed::Version => {
            println!("oc {}", env!("CARGO_PKG_VERSION"));
            EXIT_OK
        }
        Parsed::Launch(spec) => commands::launch(spec).await,
        Parsed::Send { name, text, enter } => commands::send(&name, &text, enter).await,
        Parsed::Kill { name, cascade } => commands::kill(&name, cascade).await,
        Parsed::Restart { name } => commands::restart(&name).await,
        Parsed::List { kill_untracked } => commands::list(kill_untracked).await,
        Parsed::Status => commands::status(),
        Parsed::Cleanup { include_done } => commands::cleanup(include_done).await,
        Parsed::DaemonStart => commands::daemon_start("monitor"),
        Parsed::DaemonStop => commands::daemon_stop("monitor"),
        Parsed::DaemonStatus => commands::daemon_status(),
        Parsed::SupervisorStart => commands::daemon_start("supervisor"),
        Parsed::SupervisorStop => commands::daemon_stop("supervisor"),
        Parsed::HookHandler => hook_handler::run(),
    }
}

fn print_help() {
    println!("oc {} - fleet manager for interactive coding agents", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    oc launch <name> [--dir <path>] [--prompt <text>] [--mode <normal|permissive|bypass>] [--parent <id>]");
    println!("    oc send <name> <text> [--no-enter]");
    println!("    oc kill <name> [--no-cascade]");
    println!("    oc restart <name>");
    println!("    oc list [--kill-untracked]");
    println!("    oc status");
    println!("    oc cleanup [--include-done]");
    println!("    oc daemon <start|stop|status>");
    println!("    oc supervisor <start|stop>");
    println!("    oc hook-handler");
    println!();
    println!("The tmux session scope defaults to 'agents'; override with");
    println!("OVERCODE_TMUX_SESSION. State lives under ~/.overcode/ (OVERCODE_DIR).");
}
