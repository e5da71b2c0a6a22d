// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote relay push.
//!
//! The monitor forwards its public snapshot to an optional HTTP endpoint.
//! Pushes are rate-limited, bounded by a short timeout, and failures are
//! recorded in the snapshot without ever stalling the loop.

use oc_core::snapshot::MonitorSnapshot;
use std::time::Duration;
use thiserror::Error;

/// Env var naming the relay endpoint.
pub const ENV_RELAY_URL: &str = "OVERCODE_RELAY_URL";
/// Env var carrying the bearer key.
pub const ENV_RELAY_KEY: &str = "OVERCODE_RELAY_KEY";
/// Env var overriding the push interval in seconds.
pub const ENV_RELAY_INTERVAL: &str = "OVERCODE_RELAY_INTERVAL";

const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_secs(30);
const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay push failed: {0}")]
    Push(String),
    #[error("relay returned status {0}")]
    Status(u16),
}

/// Relay endpoint configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub url: String,
    pub api_key: String,
    pub interval: Duration,
}

impl RelayConfig {
    /// `None` when no relay is configured.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(ENV_RELAY_URL).ok()?;
        let api_key = std::env::var(ENV_RELAY_KEY).unwrap_or_default();
        let interval = std::env::var(ENV_RELAY_INTERVAL)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PUSH_INTERVAL);
        Some(Self {
            url,
            api_key,
            interval,
        })
    }
}

/// HTTP client wrapper for the relay.
pub struct RelayClient {
    config: RelayConfig,
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new(config: RelayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { config, http }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// POST the snapshot projection with bearer auth.
    pub async fn push(&self, snapshot: &MonitorSnapshot) -> Result<(), RelayError> {
        let response = self
            .http
            .post(&self.config.url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(snapshot)
            .send()
            .await
            .map_err(|e| RelayError::Push(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
