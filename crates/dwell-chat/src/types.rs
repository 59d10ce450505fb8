//! Values returned by [`crate::SearchService`] to its caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dwell_core::{FilterSet, Record};

use crate::error::TurnFailure;
use crate::graph::Node;
use crate::state::SessionState;

/// Filter values plus derived counts, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    #[serde(flatten)]
    pub filters: FilterSet,
    pub essential_count: usize,
    pub optional_count: usize,
    pub is_complete: bool,
}

impl From<&FilterSet> for FilterSnapshot {
    fn from(filters: &FilterSet) -> Self {
        Self {
            filters: filters.clone(),
            essential_count: filters.essential_count(),
            optional_count: filters.optional_count(),
            is_complete: filters.is_complete(),
        }
    }
}

/// Outcome of one submitted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    pub session_id: String,
    /// Latest assistant message after the turn.
    pub message: String,
    pub filters: FilterSnapshot,
    pub ready_to_search: bool,
    /// Number of rows found, when this session has run a search.
    pub result_count: Option<usize>,
}

impl From<&SessionState> for TurnReply {
    fn from(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            message: state
                .last_assistant_message()
                .unwrap_or_default()
                .to_string(),
            filters: FilterSnapshot::from(&state.filters),
            ready_to_search: state.flags.ready_to_search,
            result_count: if state.query_executed {
                state.result_count()
            } else {
                None
            },
        }
    }
}

/// Rows of the most recent search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub session_id: String,
    pub count: usize,
    pub rows: Vec<Record>,
    pub filters_used: FilterSnapshot,
    pub generated_query: Option<String>,
}

/// Summary of a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub message_count: usize,
    pub essential_complete: bool,
    pub essential_count: usize,
    pub optional_count: usize,
    pub ready_to_search: bool,
    pub query_executed: bool,
    pub current_node: Node,
    pub last_error: Option<TurnFailure>,
}

impl From<&SessionState> for SessionInfo {
    fn from(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            created_at: state.created_at,
            last_updated: state.last_updated,
            message_count: state.messages.len(),
            essential_complete: state.flags.essential_complete,
            essential_count: state.filters.essential_count(),
            optional_count: state.filters.optional_count(),
            ready_to_search: state.flags.ready_to_search,
            query_executed: state.query_executed,
            current_node: state.current_node,
            last_error: state.last_error.clone(),
        }
    }
}

/// Confirmation that a session was reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAck {
    pub session_id: String,
    pub message: String,
}
