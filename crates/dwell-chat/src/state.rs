//! Per-session conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dwell_core::{FilterSet, Record};

use crate::error::TurnFailure;
use crate::graph::Node;

/// Author of a logged message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the append-only message log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Control flags that steer routing between turns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationFlags {
    pub essential_complete: bool,
    pub awaiting_optional_confirmation: bool,
    pub collecting_optional: bool,
    pub ready_to_search: bool,
}

/// Everything known about one conversation.
///
/// Only workflow nodes mutate this, one turn at a time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub filters: FilterSet,
    pub flags: ConversationFlags,
    pub generated_query: Option<String>,
    pub query_validated: bool,
    pub query_executed: bool,
    pub results: Option<Vec<Record>>,
    pub current_node: Node,
    pub last_error: Option<TurnFailure>,
}

impl SessionState {
    /// A fresh session: no messages, no filters, all flags cleared.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_updated: now,
            messages: Vec::new(),
            filters: FilterSet::default(),
            flags: ConversationFlags::default(),
            generated_query: None,
            query_validated: false,
            query_executed: false,
            results: None,
            current_node: Node::ReceiveMessage,
            last_error: None,
        }
    }

    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.last_message_by(Role::User)
    }

    pub fn last_assistant_message(&self) -> Option<&str> {
        self.last_message_by(Role::Assistant)
    }

    fn last_message_by(&self, role: Role) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }

    pub fn result_count(&self) -> Option<usize> {
        self.results.as_ref().map(Vec::len)
    }

    /// Forget any previous query attempt and its results.
    pub fn clear_query(&mut self) {
        self.generated_query = None;
        self.query_validated = false;
        self.query_executed = false;
        self.results = None;
    }
}
