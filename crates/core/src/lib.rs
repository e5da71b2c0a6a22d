// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-core: Core library for the Overcode fleet manager
//!
//! Domain types and pure functions shared by every other crate: the session
//! record and its stats, the runtime status enum, name validation, the
//! on-disk path layout, and the time/cost accounting primitives. No I/O
//! lives here.

pub mod accounting;
pub mod clock;
pub mod name;
pub mod paths;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod supervisor;
pub mod time_context;
pub mod time_fmt;

pub use accounting::{
    accumulate_time, aggregate_sessions, estimate_cost, green_percentage, median, should_sync,
    total_tokens, FleetTotals, Pricing, TimeAccumulation, TokenUsage, UPTIME_CAP_TOLERANCE,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use name::{validate_name, NameError};
pub use paths::OvercodePaths;
pub use session::{Permissiveness, Session, SessionLifecycle, SessionStats};
pub use snapshot::{MonitorSnapshot, PresenceSample, RelayState, SessionView};
pub use status::{AgentStatus, ParseStatusError};
pub use supervisor::SupervisorStats;
pub use time_fmt::{format_compact, parse_frequency, FrequencyError, MIN_HEARTBEAT_FREQUENCY};
