// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt paste-buffer batching.
//!
//! A single `send-keys` call with a long prompt can exceed the shell's
//! command-line limits, so prompts go through the multiplexer's paste
//! buffer in bounded batches of lines, with one Enter at the very end.

use oc_adapters::{TmuxAdapter, TmuxError};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum lines per paste-buffer batch.
pub const PROMPT_BATCH_LINES: usize = 20;

/// Pause between batches so the TUI keeps up.
const INTER_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Split a prompt into batches of at most [`PROMPT_BATCH_LINES`] lines.
pub fn split_prompt_batches(prompt: &str) -> Vec<String> {
    let lines: Vec<&str> = prompt.lines().collect();
    lines
        .chunks(PROMPT_BATCH_LINES)
        .map(|chunk| chunk.join("\n"))
        .collect()
}

/// Paste a prompt into a window batch by batch, then submit with a single
/// Enter.
pub async fn paste_prompt<T: TmuxAdapter>(
    tmux: &T,
    tmux_session: &str,
    window: u32,
    prompt: &str,
    startup_delay: Duration,
) -> Result<(), TmuxError> {
    if !startup_delay.is_zero() {
        tokio::time::sleep(startup_delay).await;
    }

    for batch in split_prompt_batches(prompt) {
        let file = scratch_file();
        std::fs::write(&file, &batch).map_err(|e| TmuxError::CommandFailed(e.to_string()))?;
        let loaded = tmux.load_buffer(&file).await;
        let _ = std::fs::remove_file(&file);
        loaded?;

        tmux.paste_buffer(tmux_session, window).await?;
        tokio::time::sleep(INTER_BATCH_DELAY).await;
    }

    tmux.send_keys(tmux_session, window, "", true).await
}

fn scratch_file() -> PathBuf {
    std::env::temp_dir().join(format!("oc_prompt_{}.txt", uuid::Uuid::new_v4()))
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
