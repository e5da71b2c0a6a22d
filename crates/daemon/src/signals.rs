// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown flag, activity signal, and interruptible sleep.
//!
//! The activity signal is a 0-byte file any producer may touch; the
//! sleeping daemon consumes (deletes) it and wakes early. Producers are
//! idempotent — touching twice is safe.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the sleeper polls for the signal file and the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Shared shutdown flag set by signal handlers.
#[derive(Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Install SIGTERM/SIGINT handlers that trigger this flag.
    pub fn install_handlers(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let flag = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
            flag.trigger();
        });
        Ok(())
    }
}

/// Touch the activity-signal file to wake sleeping daemons.
pub fn touch_activity_signal(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"")
}

/// Consume the signal if present. Returns true exactly once per touch.
pub fn consume_activity_signal(path: &Path) -> bool {
    if path.exists() {
        let _ = std::fs::remove_file(path);
        return true;
    }
    false
}

/// Sleep for `total`, waking early when the shutdown flag is set or the
/// activity signal is touched. Chunked so even long intervals stay
/// responsive.
pub async fn interruptible_sleep(total: Duration, shutdown: &Shutdown, signal_path: &Path) {
    let deadline = tokio::time::Instant::now() + total;
    loop {
        if shutdown.is_triggered() || consume_activity_signal(signal_path) {
            return;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return;
        }
        let nap = POLL_INTERVAL.min(deadline - now);
        tokio::time::sleep(nap).await;
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
