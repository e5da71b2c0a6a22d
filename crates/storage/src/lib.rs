// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-storage: Durable state for the Overcode fleet manager
//!
//! Single-file JSON stores with atomic replace (sibling temp file + rename)
//! plus the append-only CSV history logs. Cross-process safety comes from
//! the rename discipline and retry-on-read; in-process writers serialize
//! through one mutex per registry.

pub mod atomic;
pub mod history;
pub mod registry;
pub mod supervisor_stats;

pub use atomic::{read_json, write_json_atomic, StorageError};
pub use history::{
    append_agent_status, append_presence, read_agent_status_history, AgentStatusRow,
};
pub use registry::{RegistryError, SessionRegistry, MAX_SESSION_DEPTH};
pub use supervisor_stats::{load_supervisor_stats, save_supervisor_stats};
