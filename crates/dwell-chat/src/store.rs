//! In-memory session lifecycle.
//!
//! Sessions live only in process memory. There is no background sweeper:
//! expired sessions are evicted opportunistically whenever the store is
//! accessed. A session is expired when the time since its last update is
//! strictly greater than the configured timeout.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::state::SessionState;

/// Refreshes a session's activity timestamp while a turn is in flight.
pub trait KeepAlive: Send + Sync {
    fn keep_alive(&self, session_id: &str);
}

/// Keyed owner of every live [`SessionState`].
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
    timeout: chrono::Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Create and store a fresh session. A random id is assigned when none is
    /// given; an existing session with the same id is replaced.
    pub fn create_session(&self, id: Option<&str>) -> SessionState {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let state = SessionState::new(id.clone());
        self.lock().insert(id.clone(), state.clone());
        tracing::debug!(session_id = %id, "Session created");
        state
    }

    /// Return the live session for `id`, or a fresh one if it is absent or
    /// has expired.
    pub fn get_or_create(&self, id: &str) -> SessionState {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions);
        if let Some(state) = sessions.get(id) {
            return state.clone();
        }
        let state = SessionState::new(id);
        sessions.insert(id.to_string(), state.clone());
        tracing::debug!(session_id = %id, "Session created");
        state
    }

    /// Return the live session for `id` without creating one.
    pub fn get(&self, id: &str) -> Option<SessionState> {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions);
        sessions.get(id).cloned()
    }

    /// Persist `state` under its own id and refresh its activity timestamp.
    pub fn update(&self, mut state: SessionState) -> SessionState {
        state.last_updated = Utc::now();
        self.lock()
            .insert(state.session_id.clone(), state.clone());
        state
    }

    /// Refresh the activity timestamp. Returns false if the session is gone.
    pub fn touch(&self, id: &str) -> bool {
        match self.lock().get_mut(id) {
            Some(state) => {
                state.last_updated = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Remove a session. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session deleted");
        }
        removed
    }

    /// Number of sessions that have not expired.
    pub fn count_active(&self) -> usize {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions);
        sessions.len()
    }

    pub fn is_expired(&self, state: &SessionState) -> bool {
        Utc::now() - state.last_updated > self.timeout
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, SessionState>) {
        let before = sessions.len();
        sessions.retain(|_, state| !self.is_expired(state));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted expired sessions");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeepAlive for SessionStore {
    fn keep_alive(&self, session_id: &str) {
        self.touch(session_id);
    }
}
