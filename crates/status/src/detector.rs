// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The detection contract both implementations satisfy.

use async_trait::async_trait;
use oc_core::session::Session;
use oc_core::status::AgentStatus;

/// How many trailing pane lines a detector examines.
pub const PANE_CAPTURE_LINES: u32 = 50;

/// One classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub status: AgentStatus,
    pub activity: String,
    /// The pane text the classification was based on; empty when the pane
    /// was unreadable.
    pub pane: String,
}

impl Detection {
    pub fn new(status: AgentStatus, activity: impl Into<String>, pane: impl Into<String>) -> Self {
        Self {
            status,
            activity: activity.into(),
            pane: pane.into(),
        }
    }
}

/// Contract shared by the polling and hook detectors.
///
/// Implementations never error: an unreadable pane classifies as
/// `waiting_user` with an explanatory activity.
#[async_trait]
pub trait StatusDetector: Send + Sync {
    async fn detect(&self, session: &Session) -> Detection;

    /// Raw pane text for a window, `None` when unreadable.
    async fn pane_content(&self, window: u32, lines: u32) -> Option<String>;
}
