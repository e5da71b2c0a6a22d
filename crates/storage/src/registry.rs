// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session registry: durable id → record mapping with hierarchy.
//!
//! All mutations go through one atomic read-modify-write helper guarded by
//! a process-wide mutex: load `sessions.json`, apply the closure, write to
//! a sibling temp file, rename. A corrupt file loads as an empty registry
//! so a bad write can never take the fleet down.

use crate::atomic::{read_json, write_json_atomic, StorageError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use oc_core::name::{validate_name, NameError};
use oc_core::paths::OvercodePaths;
use oc_core::session::{Permissiveness, Session, SessionStats};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Parent chains must terminate at a root within this many hops.
pub const MAX_SESSION_DEPTH: usize = 5;

type SessionMap = IndexMap<String, Session>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("session name already in use: {0}")]
    DuplicateName(String),
    #[error("parent session not found: {0}")]
    ParentNotFound(String),
    #[error("session depth {0} exceeds the maximum of {MAX_SESSION_DEPTH}")]
    DepthExceeded(usize),
    #[error("budget must be >= 0, got {0}")]
    NegativeBudget(f64),
    #[error("budget transfer amount must be positive")]
    NonPositiveTransfer,
    #[error("budget transfer source must be an ancestor of the target")]
    NotAncestor,
    #[error("insufficient budget: {available:.4} available, {requested:.4} requested")]
    InsufficientBudget { available: f64, requested: f64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Durable session registry for one tmux session scope.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions_path: PathBuf,
    archived_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SessionRegistry {
    pub fn new(paths: &OvercodePaths, tmux_session: &str) -> std::io::Result<Self> {
        paths.ensure_session_dir(tmux_session)?;
        Ok(Self {
            sessions_path: paths.sessions_file(tmux_session),
            archived_path: paths.archived_sessions_file(tmux_session),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Load the live map. Missing or corrupt files yield an empty registry;
    /// availability beats completeness here.
    fn load(&self) -> SessionMap {
        load_map(&self.sessions_path)
    }

    fn load_archived(&self) -> SessionMap {
        load_map(&self.archived_path)
    }

    /// The atomic read-modify-write helper every mutation goes through.
    fn mutate<R>(
        &self,
        apply: impl FnOnce(&mut SessionMap) -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let _guard = self.write_lock.lock();
        let mut sessions = self.load();
        let result = apply(&mut sessions)?;
        write_json_atomic(&self.sessions_path, &sessions)?;
        Ok(result)
    }

    /// Register a new session. Validates the name, enforces per-scope name
    /// uniqueness, checks the parent exists and the depth bound.
    pub fn create_session(&self, session: Session) -> Result<Session, RegistryError> {
        validate_name(&session.name)?;
        self.mutate(|sessions| {
            if sessions.values().any(|s| s.name == session.name) {
                return Err(RegistryError::DuplicateName(session.name.clone()));
            }
            if let Some(ref parent_id) = session.parent_session_id {
                if !sessions.contains_key(parent_id) {
                    return Err(RegistryError::ParentNotFound(parent_id.clone()));
                }
                let depth = depth_of(sessions, parent_id) + 1;
                if depth > MAX_SESSION_DEPTH {
                    return Err(RegistryError::DepthExceeded(depth));
                }
            }
            sessions.insert(session.id.clone(), session.clone());
            Ok(session)
        })
    }

    pub fn get_session(&self, id: &str) -> Option<Session> {
        self.load().get(id).cloned()
    }

    pub fn get_session_by_name(&self, name: &str) -> Option<Session> {
        self.load().values().find(|s| s.name == name).cloned()
    }

    /// All live sessions in insertion order.
    pub fn list_sessions(&self) -> Vec<Session> {
        self.load().into_values().collect()
    }

    /// Archived sessions are read-only.
    pub fn list_archived_sessions(&self) -> Vec<Session> {
        self.load_archived().into_values().collect()
    }

    /// Apply an arbitrary field mutation to one session.
    pub fn update_session(
        &self,
        id: &str,
        apply: impl FnOnce(&mut Session),
    ) -> Result<Session, RegistryError> {
        self.mutate(|sessions| {
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            apply(session);
            Ok(session.clone())
        })
    }

    /// Mutate one session's stats, re-deriving `total_tokens`.
    pub fn update_stats(
        &self,
        id: &str,
        apply: impl FnOnce(&mut SessionStats),
    ) -> Result<(), RegistryError> {
        self.update_session(id, |session| {
            apply(&mut session.stats);
            session.stats.total_tokens = oc_core::accounting::total_tokens(
                session.stats.input_tokens,
                session.stats.output_tokens,
                session.stats.cache_creation_tokens,
                session.stats.cache_read_tokens,
            );
        })
        .map(|_| ())
    }

    /// Any write to the instructions resets `standing_orders_complete`.
    pub fn set_standing_instructions(
        &self,
        id: &str,
        instructions: &str,
    ) -> Result<(), RegistryError> {
        self.update_session(id, |session| {
            session.standing_instructions = instructions.to_string();
            session.standing_orders_complete = false;
        })
        .map(|_| ())
    }

    pub fn set_standing_orders_complete(
        &self,
        id: &str,
        complete: bool,
    ) -> Result<(), RegistryError> {
        self.update_session(id, |session| session.standing_orders_complete = complete)
            .map(|_| ())
    }

    pub fn set_permissiveness(
        &self,
        id: &str,
        mode: Permissiveness,
    ) -> Result<(), RegistryError> {
        self.update_session(id, |session| session.permissiveness_mode = mode)
            .map(|_| ())
    }

    pub fn set_agent_value(&self, id: &str, value: i64) -> Result<(), RegistryError> {
        self.update_session(id, |session| session.agent_value = value)
            .map(|_| ())
    }

    pub fn set_human_annotation(&self, id: &str, annotation: &str) -> Result<(), RegistryError> {
        self.update_session(id, |session| session.human_annotation = annotation.to_string())
            .map(|_| ())
    }

    /// 0 clears to unlimited; negative budgets are rejected.
    pub fn set_cost_budget(&self, id: &str, budget_usd: f64) -> Result<(), RegistryError> {
        if budget_usd < 0.0 {
            return Err(RegistryError::NegativeBudget(budget_usd));
        }
        self.update_session(id, |session| session.cost_budget_usd = budget_usd)
            .map(|_| ())
    }

    /// Move budget from an ancestor to a descendant.
    ///
    /// A bounded source must have `budget - spent >= amount`; the amount is
    /// deducted from it. An unlimited source (budget 0) just sets the
    /// target's budget. A target with no budget gets `amount`; otherwise
    /// the amount is added.
    pub fn transfer_budget(
        &self,
        src_id: &str,
        tgt_id: &str,
        amount: f64,
    ) -> Result<(), RegistryError> {
        if amount <= 0.0 {
            return Err(RegistryError::NonPositiveTransfer);
        }
        self.mutate(|sessions| {
            if !sessions.contains_key(src_id) {
                return Err(RegistryError::NotFound(src_id.to_string()));
            }
            if !sessions.contains_key(tgt_id) {
                return Err(RegistryError::NotFound(tgt_id.to_string()));
            }
            if !is_ancestor_of(sessions, src_id, tgt_id) {
                return Err(RegistryError::NotAncestor);
            }

            let src = &sessions[src_id];
            let src_unlimited = src.cost_budget_usd == 0.0;
            if !src_unlimited {
                let available = src.cost_budget_usd - src.stats.estimated_cost_usd;
                if available < amount {
                    return Err(RegistryError::InsufficientBudget {
                        available,
                        requested: amount,
                    });
                }
            }

            if !src_unlimited {
                if let Some(src) = sessions.get_mut(src_id) {
                    src.cost_budget_usd -= amount;
                }
            }
            if let Some(tgt) = sessions.get_mut(tgt_id) {
                if tgt.cost_budget_usd == 0.0 {
                    tgt.cost_budget_usd = amount;
                } else {
                    tgt.cost_budget_usd += amount;
                }
            }
            Ok(())
        })
    }

    /// Walk up from `descendant_id`; true when `ancestor_id` is on the
    /// parent chain.
    pub fn is_ancestor(&self, ancestor_id: &str, descendant_id: &str) -> bool {
        is_ancestor_of(&self.load(), ancestor_id, descendant_id)
    }

    /// BFS over the child index, nearest first.
    pub fn get_descendants(&self, id: &str) -> Vec<Session> {
        let sessions = self.load();
        let mut result = Vec::new();
        let mut frontier = vec![id.to_string()];
        while let Some(current) = frontier.pop() {
            for session in sessions.values() {
                if session.parent_session_id.as_deref() == Some(current.as_str()) {
                    frontier.push(session.id.clone());
                    result.push(session.clone());
                }
            }
        }
        result
    }

    /// Hops to the root; 0 for a root session or an unknown id.
    pub fn compute_depth(&self, id: &str) -> usize {
        depth_of(&self.load(), id)
    }

    /// Record a runtime session id; false when it was already known.
    pub fn add_claude_session_id(
        &self,
        id: &str,
        claude_session_id: &str,
    ) -> Result<bool, RegistryError> {
        self.mutate(|sessions| {
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            Ok(session.add_claude_session_id(claude_session_id))
        })
    }

    /// Remove a record entirely. Returns false when the id was unknown.
    pub fn delete_session(&self, id: &str) -> Result<bool, RegistryError> {
        self.mutate(|sessions| Ok(sessions.shift_remove(id).is_some()))
    }

    /// Move a record into the archive with its end time. Returns false when
    /// the id was unknown.
    pub fn archive_session(
        &self,
        id: &str,
        end_time: DateTime<Utc>,
    ) -> Result<bool, RegistryError> {
        let _guard = self.write_lock.lock();
        let mut sessions = self.load();
        let Some(mut session) = sessions.shift_remove(id) else {
            return Ok(false);
        };
        session.end_time = Some(end_time);

        let mut archived = self.load_archived();
        archived.insert(session.id.clone(), session);

        write_json_atomic(&self.archived_path, &archived)?;
        write_json_atomic(&self.sessions_path, &sessions)?;
        Ok(true)
    }
}

fn load_map(path: &std::path::Path) -> SessionMap {
    match read_json::<SessionMap>(path) {
        Ok(Some(map)) => map,
        Ok(None) => SessionMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt registry file, starting empty");
            SessionMap::new()
        }
    }
}

fn is_ancestor_of(sessions: &SessionMap, ancestor_id: &str, descendant_id: &str) -> bool {
    let mut current = sessions
        .get(descendant_id)
        .and_then(|s| s.parent_session_id.clone());
    // Hop bound guards against cycles in hand-edited files
    for _ in 0..=MAX_SESSION_DEPTH {
        match current {
            Some(id) if id == ancestor_id => return true,
            Some(id) => current = sessions.get(&id).and_then(|s| s.parent_session_id.clone()),
            None => return false,
        }
    }
    false
}

fn depth_of(sessions: &SessionMap, id: &str) -> usize {
    let mut depth = 0;
    let mut current = sessions.get(id).and_then(|s| s.parent_session_id.clone());
    while let Some(parent_id) = current {
        depth += 1;
        if depth > MAX_SESSION_DEPTH {
            break;
        }
        current = sessions
            .get(&parent_id)
            .and_then(|s| s.parent_session_id.clone());
    }
    depth
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
