// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-daemon: The Overcode background daemons
//!
//! Two loops per tmux session: the monitor (detect → accumulate → sync →
//! heartbeat → publish → relay) and the supervisor (select non-green
//! agents, run one exclusive robot-supervisor worker, count its
//! interventions). Each runs as its own process with a pid file, a log
//! file, and an interruptible sleep woken by the activity-signal file.

pub mod logging;
pub mod monitor;
pub mod pidfile;
pub mod presence;
pub mod relay;
pub mod signals;
pub mod supervisor;

pub use monitor::{MonitorConfig, MonitorDaemon};
pub use presence::{NoopPresence, PresenceProbe};
pub use relay::{RelayClient, RelayConfig, RelayError};
pub use supervisor::{SupervisorConfig, SupervisorDaemon};
