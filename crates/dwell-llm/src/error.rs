use thiserror::Error;

use dwell_core::CollaboratorError;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("{message}")]
    InvalidResponse { message: String },
}

impl LlmError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        LlmError::InvalidResponse {
            message: message.into(),
        }
    }
}

impl From<LlmError> for CollaboratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse { message } => CollaboratorError::InvalidResponse(message),
            LlmError::Json(e) => CollaboratorError::InvalidResponse(e.to_string()),
            LlmError::Timeout(ms) => CollaboratorError::Timeout(ms),
            other => CollaboratorError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_response_maps_to_invalid_response() {
        let err: CollaboratorError = LlmError::invalid_response("no choices").into();
        assert_eq!(err, CollaboratorError::InvalidResponse("no choices".into()));
    }

    #[test]
    fn test_timeout_keeps_duration() {
        let err: CollaboratorError = LlmError::Timeout(1500).into();
        assert_eq!(err, CollaboratorError::Timeout(1500));
    }

    #[test]
    fn test_json_error_maps_to_invalid_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: CollaboratorError = LlmError::from(json_err).into();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }
}
