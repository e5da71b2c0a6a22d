// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-status: Status detection for the Overcode fleet manager
//!
//! Two implementations behind one contract. The polling detector
//! classifies captured pane text; the hook detector reads the
//! freshness-windowed state files written by the runtime's hook handler
//! and falls back to polling whenever they are missing or stale. Hooks
//! are precise when present but depend on the host runtime's cooperation;
//! polling is always available.

mod detector;
pub mod hook;
pub mod polling;

pub use detector::{Detection, StatusDetector, PANE_CAPTURE_LINES};
pub use hook::{HookDetector, DEFAULT_STALE_THRESHOLD_SECONDS};
pub use polling::PollingDetector;
