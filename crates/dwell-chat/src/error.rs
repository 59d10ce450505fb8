//! Error types for the conversation service.

use serde::{Deserialize, Serialize};

/// Conditions the conversation service reports to its caller.
///
/// Collaborator and validator failures never appear here; they are recorded
/// on the session as a [`TurnFailure`] and surfaced as an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("no search has been executed yet for session {0}")]
    NotExecutedYet(String),
}

/// Stage of a turn at which something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Filter extraction failed; the turn continued without new filters.
    Extraction,
    /// The synthesizer produced no candidate.
    Synthesis,
    /// No candidate passed validation within the attempt budget.
    Validation,
    /// The listing store failed the validated query.
    Execution,
    /// The turn did not reach a terminal node within the visit limit.
    Routing,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Extraction => "extraction",
            FailureKind::Synthesis => "synthesis",
            FailureKind::Validation => "validation",
            FailureKind::Execution => "execution",
            FailureKind::Routing => "routing",
        }
    }
}

/// A failure recorded on the session during the most recent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TurnFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failure: {}", self.kind.as_str(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::EmptyMessage;
        assert_eq!(err.to_string(), "message cannot be empty");

        let err = ChatError::MessageTooLong(2000);
        assert_eq!(
            err.to_string(),
            "message exceeds maximum length of 2000 characters"
        );

        let err = ChatError::SessionNotFound("abc".to_string());
        assert_eq!(err.to_string(), "session not found: abc");

        let err = ChatError::NotExecutedYet("abc".to_string());
        assert_eq!(
            err.to_string(),
            "no search has been executed yet for session abc"
        );
    }

    #[test]
    fn test_chat_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(ChatError::EmptyMessage);
        assert_eq!(err.to_string(), "message cannot be empty");
    }

    #[test]
    fn test_turn_failure_display() {
        let failure = TurnFailure::new(FailureKind::Validation, "forbidden keyword: DROP");
        assert_eq!(
            failure.to_string(),
            "validation failure: forbidden keyword: DROP"
        );
    }

    #[test]
    fn test_failure_kind_serde() {
        let json = serde_json::to_string(&FailureKind::Execution).unwrap();
        assert_eq!(json, "\"execution\"");
        let failure: TurnFailure =
            serde_json::from_str(r#"{"kind":"extraction","message":"timeout"}"#).unwrap();
        assert_eq!(failure.kind, FailureKind::Extraction);
    }
}
