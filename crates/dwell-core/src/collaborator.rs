//! Contracts for the external collaborators the conversation workflow calls.
//!
//! Filter extraction, query synthesis and repair, and response wording are
//! delegated to a generative backend; query execution is delegated to the
//! listing store. The workflow only sees these traits, so every
//! implementation is interchangeable with a scripted one in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filters::{EssentialFilter, FilterPatch, FilterSet};

/// One row returned by the listing store, with columns in select order.
pub type Record = Map<String, Value>;

/// Failure reported by (or on behalf of) a collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator timed out after {0} ms")]
    Timeout(u64),

    #[error("invalid collaborator response: {0}")]
    InvalidResponse(String),
}

/// Result of running a validated query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub rows: Vec<Record>,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn ok(rows: Vec<Record>) -> Self {
        Self {
            success: true,
            rows,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            rows: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Which kind of failure an error summary should describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSituation {
    /// No safe query could be produced.
    InvalidQuery,
    /// The store refused or failed the query.
    StoreFailure,
}

/// Named situation a response must be worded for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "situation", rename_all = "snake_case")]
pub enum Situation {
    /// Ask the user for one missing essential criterion.
    MissingFilter {
        filter: EssentialFilter,
        filters: FilterSet,
    },
    /// Offer to add optional criteria before searching.
    AdditionalFilters { filters: FilterSet },
    /// Summarise a completed search.
    ResultsSummary { count: usize, filters: FilterSet },
    /// Explain that the search could not be completed.
    ErrorSummary { kind: ErrorSituation },
}

impl Situation {
    pub fn name(&self) -> &'static str {
        match self {
            Situation::MissingFilter { .. } => "missing_filter",
            Situation::AdditionalFilters { .. } => "additional_filters",
            Situation::ResultsSummary { .. } => "results_summary",
            Situation::ErrorSummary { .. } => "error_summary",
        }
    }
}

/// Turns a free-text message into a partial filter update.
#[async_trait]
pub trait FilterExtractor: Send + Sync {
    async fn extract(
        &self,
        message: &str,
        current: &FilterSet,
    ) -> Result<FilterPatch, CollaboratorError>;
}

/// Produces a candidate query for a complete filter set. The candidate may be
/// invalid; validation is not its responsibility.
#[async_trait]
pub trait QuerySynthesizer: Send + Sync {
    async fn synthesize(&self, filters: &FilterSet) -> Result<String, CollaboratorError>;
}

/// Revises a rejected candidate given the rejection reason.
#[async_trait]
pub trait QueryFixer: Send + Sync {
    async fn fix(
        &self,
        original: &str,
        reason: &str,
        filters: &FilterSet,
    ) -> Result<String, CollaboratorError>;
}

/// Words a user-facing message for a named situation.
#[async_trait]
pub trait ResponseComposer: Send + Sync {
    async fn compose(&self, situation: &Situation) -> Result<String, CollaboratorError>;
}

/// Runs a validated query against the listing store.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str) -> Result<ExecutionResult, CollaboratorError>;
}
