//! Search service: the single entry point a transport talks to.
//!
//! Owns the session store and the workflow, validates inbound messages, and
//! guarantees at most one turn in flight per session id. Turns for different
//! sessions run independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use dwell_core::{DwellConfig, QueryGuard};

use crate::error::ChatError;
use crate::graph::{Collaborators, Workflow, WorkflowSettings};
use crate::store::SessionStore;
use crate::types::{FilterSnapshot, ResetAck, SearchResults, SessionInfo, TurnReply};

/// Central conversation service, constructed once and shared by handle.
pub struct SearchService {
    store: SessionStore,
    workflow: Workflow,
    turn_locks: TurnLocks,
    max_message_chars: usize,
}

impl SearchService {
    /// Build the service from configuration and a set of collaborators.
    pub fn new(config: &DwellConfig, collaborators: Collaborators) -> Self {
        let store = SessionStore::new(Duration::from_secs(config.session.timeout_secs));
        let workflow = Workflow::new(
            collaborators,
            QueryGuard::new(config.guard.clone()),
            WorkflowSettings::from(&config.workflow),
        );
        Self::from_parts(store, workflow, config.session.max_message_chars)
    }

    pub fn from_parts(store: SessionStore, workflow: Workflow, max_message_chars: usize) -> Self {
        Self {
            store,
            workflow,
            turn_locks: TurnLocks::default(),
            max_message_chars,
        }
    }

    /// Run one turn. A new session is created when `session_id` is absent,
    /// unknown, or expired.
    pub async fn submit_message(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<TurnReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.max_message_chars {
            return Err(ChatError::MessageTooLong(self.max_message_chars));
        }

        let session_id = match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let _turn = self.turn_locks.acquire(&session_id).await;

        let mut state = self.store.get_or_create(&session_id);
        tracing::info!(
            session_id = %session_id,
            messages = state.messages.len(),
            "Processing message"
        );

        self.workflow.run_turn(&mut state, message, &self.store).await;
        let state = self.store.update(state);

        tracing::info!(
            session_id = %session_id,
            node = %state.current_node,
            essential = state.filters.essential_count(),
            optional = state.filters.optional_count(),
            ready_to_search = state.flags.ready_to_search,
            "Turn complete"
        );

        Ok(TurnReply::from(&state))
    }

    /// Rows, filters, and query of the session's most recent search.
    pub fn get_results(&self, session_id: &str) -> Result<SearchResults, ChatError> {
        let state = self
            .store
            .get(session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;

        if !state.query_executed {
            return Err(ChatError::NotExecutedYet(session_id.to_string()));
        }
        let rows = state
            .results
            .clone()
            .ok_or_else(|| ChatError::NotExecutedYet(session_id.to_string()))?;

        Ok(SearchResults {
            session_id: state.session_id.clone(),
            count: rows.len(),
            rows,
            filters_used: FilterSnapshot::from(&state.filters),
            generated_query: state.generated_query.clone(),
        })
    }

    /// Replace the session with a fresh one under the same id.
    pub async fn reset_session(&self, session_id: &str) -> ResetAck {
        let _turn = self.turn_locks.acquire(session_id).await;
        self.store.delete(session_id);
        self.store.create_session(Some(session_id));
        tracing::info!(session_id = %session_id, "Session reset");
        ResetAck {
            session_id: session_id.to_string(),
            message: "Session reset. Let's start a new search.".to_string(),
        }
    }

    pub fn session_info(&self, session_id: &str) -> Result<SessionInfo, ChatError> {
        self.store
            .get(session_id)
            .map(|state| SessionInfo::from(&state))
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    pub fn active_session_count(&self) -> usize {
        self.store.count_active()
    }
}

// =============================================================================
// Per-session turn serialization
// =============================================================================

/// One async mutex per session id with a turn in flight or queued.
#[derive(Default)]
struct TurnLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLocks {
    async fn acquire(&self, session_id: &str) -> TurnGuard<'_> {
        let lock = self
            .map()
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        TurnGuard {
            locks: self,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Holds a session's turn lock; releases it and prunes the entry on drop.
struct TurnGuard<'a> {
    locks: &'a TurnLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.map();
        self.guard.take();
        if let Some(lock) = map.get(&self.session_id) {
            // Only the map still refers to it: no holder and no waiter.
            if Arc::strong_count(lock) == 1 {
                map.remove(&self.session_id);
            }
        }
    }
}
