//! Bounded validate-and-fix loop around query synthesis.
//!
//! The coordinator checks the current candidate with the [`QueryGuard`]. A
//! rejected candidate is handed to the fixer together with the rejection
//! reason and the fixer's output becomes the next candidate. At most
//! `max_attempts` candidates are validated, so the fixer runs at most
//! `max_attempts - 1` times. A missing candidate (synthesis produced nothing)
//! counts as a failed attempt.

use std::future::Future;

use dwell_core::{CollaboratorError, QueryGuard, QueryVerdict};

/// Reason reported for an attempt that had no candidate text.
pub const NO_CANDIDATE_REASON: &str = "no query was generated";

/// How the validation loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// A candidate passed; `query` is the cleaned, executable text.
    Validated { query: String, attempts: u32 },
    /// Every attempt was rejected.
    Exhausted {
        attempts: u32,
        reason: String,
        candidate: Option<String>,
    },
    /// The fixer itself failed; no further attempts were made.
    FixerFailed {
        attempts: u32,
        reason: String,
        error: CollaboratorError,
    },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Validated { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::FixerFailed { attempts, .. } => *attempts,
        }
    }
}

pub struct RetryCoordinator<'a> {
    guard: &'a QueryGuard,
    max_attempts: u32,
}

impl<'a> RetryCoordinator<'a> {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(guard: &'a QueryGuard, max_attempts: u32) -> Self {
        Self {
            guard,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run the loop starting from `initial`. `fix` receives the rejected text
    /// (empty when there was none) and the rejection reason.
    pub async fn run<F, Fut>(&self, initial: Option<String>, mut fix: F) -> RetryOutcome
    where
        F: FnMut(String, String) -> Fut,
        Fut: Future<Output = Result<String, CollaboratorError>>,
    {
        let mut candidate = initial;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let reason = match candidate.as_deref() {
                Some(text) => match self.guard.check(text) {
                    QueryVerdict::Accept { query, limit_added } => {
                        tracing::info!(attempt, limit_added, "Query validated");
                        return RetryOutcome::Validated {
                            query,
                            attempts: attempt,
                        };
                    }
                    QueryVerdict::Reject { reason } => reason.to_string(),
                },
                None => NO_CANDIDATE_REASON.to_string(),
            };
            tracing::info!(attempt, max_attempts = self.max_attempts, reason = %reason, "Query rejected");

            if attempt >= self.max_attempts {
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    reason,
                    candidate,
                };
            }

            let original = candidate.take().unwrap_or_default();
            match fix(original, reason.clone()).await {
                Ok(fixed) => candidate = Some(fixed),
                Err(error) => {
                    tracing::warn!(attempt, error = %error, "Query fixer failed");
                    return RetryOutcome::FixerFailed {
                        attempts: attempt,
                        reason,
                        error,
                    };
                }
            }
        }
    }
}
