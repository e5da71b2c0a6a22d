// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-adapters: External-world boundary for the Overcode fleet manager
//!
//! Two adapters live here:
//! - `tmux` — the terminal multiplexer: windows, panes, keystrokes. The only
//!   external I/O in the daemons' hot loop, so the trait has a fake
//!   implementation for deterministic tests.
//! - `claude` — read-only scanning of the agent runtime's own per-project
//!   session files for token usage.

pub mod claude;
pub mod tmux;

pub use claude::ClaudeProjects;
pub use tmux::{TmuxAdapter, TmuxCli, TmuxError, TmuxKey, WindowInfo};

#[cfg(any(test, feature = "test-support"))]
pub use tmux::{FakeTmuxAdapter, TmuxCall};
