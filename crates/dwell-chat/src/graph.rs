//! The conversation workflow as an explicit state machine.
//!
//! A turn enters at [`Node::ReceiveMessage`] and runs nodes one after another
//! until routing yields [`Node::End`]. Each node mutates the session state in
//! place and makes at most one collaborator call. Routing between nodes is the
//! pure function [`transition`], which depends only on the current node and the
//! session state.
//!
//! Collaborator failures never leave this module: every call is bounded by a
//! timeout, and errors are recorded on the session as a [`TurnFailure`] while
//! the turn continues to a terminal node.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dwell_core::config::WorkflowConfig;
use dwell_core::{
    CollaboratorError, ErrorSituation, FilterExtractor, QueryExecutor, QueryFixer, QueryGuard,
    QuerySynthesizer, ResponseComposer, Situation,
};

use crate::error::{FailureKind, TurnFailure};
use crate::fallback::{fallback_message, nothing_missing_notice, optional_cap_notice};
use crate::intent::wants_to_proceed;
use crate::merge::merge_patch;
use crate::retry::{RetryCoordinator, RetryOutcome};
use crate::state::{Role, SessionState};
use crate::store::KeepAlive;

/// Upper bound on node executions within a single turn.
pub const MAX_NODE_VISITS: usize = 32;

// =============================================================================
// Nodes and routing
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    ReceiveMessage,
    ExtractFilters,
    CheckCompletion,
    AskMissingFilter,
    AskAdditional,
    CollectOptional,
    GenerateQuery,
    ValidateQuery,
    ExecuteQuery,
    FormatResults,
    End,
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Node::ReceiveMessage => "receive_message",
            Node::ExtractFilters => "extract_filters",
            Node::CheckCompletion => "check_completion",
            Node::AskMissingFilter => "ask_missing_filter",
            Node::AskAdditional => "ask_additional",
            Node::CollectOptional => "collect_optional",
            Node::GenerateQuery => "generate_query",
            Node::ValidateQuery => "validate_query",
            Node::ExecuteQuery => "execute_query",
            Node::FormatResults => "format_results",
            Node::End => "end",
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next node after `node` has run against `state`.
pub fn transition(node: Node, state: &SessionState) -> Node {
    match node {
        Node::ReceiveMessage => Node::ExtractFilters,
        Node::ExtractFilters => Node::CheckCompletion,
        Node::CheckCompletion => {
            if !state.flags.essential_complete {
                Node::AskMissingFilter
            } else if state.flags.awaiting_optional_confirmation {
                Node::CollectOptional
            } else {
                Node::AskAdditional
            }
        }
        Node::AskMissingFilter | Node::AskAdditional => Node::End,
        Node::CollectOptional => {
            if state.flags.ready_to_search {
                Node::GenerateQuery
            } else {
                Node::ExtractFilters
            }
        }
        Node::GenerateQuery => Node::ValidateQuery,
        Node::ValidateQuery => {
            if state.query_validated {
                Node::ExecuteQuery
            } else {
                Node::FormatResults
            }
        }
        Node::ExecuteQuery => Node::FormatResults,
        Node::FormatResults | Node::End => Node::End,
    }
}

// =============================================================================
// Workflow
// =============================================================================

/// The external collaborators a workflow calls.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn FilterExtractor>,
    pub synthesizer: Arc<dyn QuerySynthesizer>,
    pub fixer: Arc<dyn QueryFixer>,
    pub composer: Arc<dyn ResponseComposer>,
    pub executor: Arc<dyn QueryExecutor>,
}

/// Tunables for [`Workflow`].
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub max_query_attempts: u32,
    pub max_optional_filters: usize,
    pub collaborator_timeout: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for WorkflowSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            max_query_attempts: config.max_query_attempts,
            max_optional_filters: config.max_optional_filters,
            collaborator_timeout: Duration::from_millis(config.collaborator_timeout_ms),
        }
    }
}

/// Drives one session's turns through the node graph.
pub struct Workflow {
    collaborators: Collaborators,
    guard: QueryGuard,
    settings: WorkflowSettings,
}

impl Workflow {
    pub fn new(
        collaborators: Collaborators,
        guard: QueryGuard,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            collaborators,
            guard,
            settings,
        }
    }

    /// Run one turn for `message`, from entry to a terminal node.
    ///
    /// `keep_alive` is refreshed before every collaborator call so the session
    /// is not evicted while the turn is in flight.
    pub async fn run_turn(
        &self,
        state: &mut SessionState,
        message: &str,
        keep_alive: &dyn KeepAlive,
    ) {
        let mut node = Node::ReceiveMessage;
        let mut visits = 0usize;

        while node != Node::End {
            visits += 1;
            if visits > MAX_NODE_VISITS {
                tracing::error!(
                    session_id = %state.session_id,
                    node = %node,
                    visits,
                    "Node visit limit exceeded; ending turn"
                );
                state.last_error = Some(TurnFailure::new(
                    FailureKind::Routing,
                    format!("turn exceeded {} node visits", MAX_NODE_VISITS),
                ));
                let text = fallback_message(&Situation::ErrorSummary {
                    kind: ErrorSituation::InvalidQuery,
                });
                state.add_message(Role::Assistant, text);
                break;
            }

            state.current_node = node;
            tracing::debug!(session_id = %state.session_id, node = %node, "Entering node");
            self.run_node(node, state, message, keep_alive).await;

            let next = transition(node, state);
            tracing::debug!(session_id = %state.session_id, from = %node, to = %next, "Routing");
            node = next;
        }
    }

    async fn run_node(
        &self,
        node: Node,
        state: &mut SessionState,
        message: &str,
        keep_alive: &dyn KeepAlive,
    ) {
        match node {
            Node::ReceiveMessage => {
                state.last_error = None;
                state.add_message(Role::User, message);
            }
            Node::ExtractFilters => self.extract_filters(state, keep_alive).await,
            Node::CheckCompletion => {
                state.flags.essential_complete = state.filters.is_complete();
            }
            Node::AskMissingFilter => self.ask_missing_filter(state, keep_alive).await,
            Node::AskAdditional => self.ask_additional(state, keep_alive).await,
            Node::CollectOptional => self.collect_optional(state),
            Node::GenerateQuery => self.generate_query(state, keep_alive).await,
            Node::ValidateQuery => self.validate_query(state, keep_alive).await,
            Node::ExecuteQuery => self.execute_query(state, keep_alive).await,
            Node::FormatResults => self.format_results(state, keep_alive).await,
            Node::End => {}
        }
    }

    // ---- nodes ----

    async fn extract_filters(&self, state: &mut SessionState, keep_alive: &dyn KeepAlive) {
        let Some(utterance) = state.last_user_message().map(str::to_string) else {
            return;
        };

        keep_alive.keep_alive(&state.session_id);
        let result = self
            .bounded(self.collaborators.extractor.extract(&utterance, &state.filters))
            .await;

        match result {
            Ok(patch) => {
                let report =
                    merge_patch(&mut state.filters, patch, self.settings.max_optional_filters);
                tracing::debug!(
                    session_id = %state.session_id,
                    applied = ?report.applied,
                    essential = state.filters.essential_count(),
                    optional = state.filters.optional_count(),
                    "Filters merged"
                );
                if !report.dropped_optional.is_empty() {
                    tracing::info!(
                        session_id = %state.session_id,
                        dropped = ?report.dropped_optional,
                        "Optional filter cap reached"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %state.session_id, error = %e, "Filter extraction failed");
                state.last_error = Some(TurnFailure::new(FailureKind::Extraction, e.to_string()));
            }
        }
    }

    async fn ask_missing_filter(&self, state: &mut SessionState, keep_alive: &dyn KeepAlive) {
        let text = match state.filters.next_missing() {
            Some(filter) => {
                let situation = Situation::MissingFilter {
                    filter,
                    filters: state.filters.clone(),
                };
                self.compose(&situation, state, keep_alive).await
            }
            None => nothing_missing_notice().to_string(),
        };
        state.add_message(Role::Assistant, text);
    }

    async fn ask_additional(&self, state: &mut SessionState, keep_alive: &dyn KeepAlive) {
        let situation = Situation::AdditionalFilters {
            filters: state.filters.clone(),
        };
        let text = self.compose(&situation, state, keep_alive).await;
        state.add_message(Role::Assistant, text);
        state.flags.awaiting_optional_confirmation = true;
        state.flags.collecting_optional = false;
        state.flags.ready_to_search = false;
    }

    fn collect_optional(&self, state: &mut SessionState) {
        let proceed = state.last_user_message().is_some_and(wants_to_proceed);
        let max = self.settings.max_optional_filters;

        if proceed || state.filters.optional_count() >= max {
            state.flags.ready_to_search = true;
            state.flags.awaiting_optional_confirmation = false;
            state.flags.collecting_optional = false;
            if !proceed {
                state.add_message(Role::Assistant, optional_cap_notice(max));
            }
            tracing::debug!(session_id = %state.session_id, proceed, "Ready to search");
        } else {
            state.flags.collecting_optional = true;
            state.flags.awaiting_optional_confirmation = false;
        }
    }

    async fn generate_query(&self, state: &mut SessionState, keep_alive: &dyn KeepAlive) {
        state.clear_query();
        keep_alive.keep_alive(&state.session_id);

        match self
            .bounded(self.collaborators.synthesizer.synthesize(&state.filters))
            .await
        {
            Ok(query) => state.generated_query = Some(query),
            Err(e) => {
                tracing::warn!(session_id = %state.session_id, error = %e, "Query synthesis failed");
                state.last_error = Some(TurnFailure::new(FailureKind::Synthesis, e.to_string()));
            }
        }
    }

    async fn validate_query(&self, state: &mut SessionState, keep_alive: &dyn KeepAlive) {
        let coordinator = RetryCoordinator::new(&self.guard, self.settings.max_query_attempts);
        let filters = state.filters.clone();
        let session_id = state.session_id.clone();

        let outcome = coordinator
            .run(state.generated_query.take(), |original, reason| {
                let filters = &filters;
                let session_id = session_id.as_str();
                async move {
                    keep_alive.keep_alive(session_id);
                    self.bounded(self.collaborators.fixer.fix(&original, &reason, filters))
                        .await
                }
            })
            .await;

        match outcome {
            RetryOutcome::Validated { query, .. } => {
                state.generated_query = Some(query);
                state.query_validated = true;
            }
            RetryOutcome::Exhausted {
                attempts,
                reason,
                candidate,
            } => {
                tracing::warn!(
                    session_id = %state.session_id,
                    attempts,
                    reason = %reason,
                    "Query validation failed"
                );
                state.generated_query = candidate;
                state.query_validated = false;
                state.last_error = Some(TurnFailure::new(
                    FailureKind::Validation,
                    format!("no valid query after {} attempts: {}", attempts, reason),
                ));
            }
            RetryOutcome::FixerFailed {
                attempts,
                reason,
                error,
            } => {
                state.query_validated = false;
                state.last_error = Some(TurnFailure::new(
                    FailureKind::Validation,
                    format!(
                        "query rejected ({}) and could not be fixed after {} attempts: {}",
                        reason, attempts, error
                    ),
                ));
            }
        }
    }

    async fn execute_query(&self, state: &mut SessionState, keep_alive: &dyn KeepAlive) {
        state.query_executed = false;
        state.results = None;

        let query = match (&state.generated_query, state.query_validated) {
            (Some(query), true) => query.clone(),
            _ => {
                state.last_error = Some(TurnFailure::new(
                    FailureKind::Execution,
                    "no validated query to execute",
                ));
                return;
            }
        };

        keep_alive.keep_alive(&state.session_id);
        match self.bounded(self.collaborators.executor.execute(&query)).await {
            Ok(result) if result.success => {
                tracing::info!(session_id = %state.session_id, rows = result.rows.len(), "Query executed");
                state.results = Some(result.rows);
                state.query_executed = true;
            }
            Ok(result) => {
                let message = result
                    .error
                    .unwrap_or_else(|| "query execution failed".to_string());
                tracing::warn!(session_id = %state.session_id, error = %message, "Query execution failed");
                state.last_error = Some(TurnFailure::new(FailureKind::Execution, message));
            }
            Err(e) => {
                tracing::warn!(session_id = %state.session_id, error = %e, "Query execution failed");
                state.last_error = Some(TurnFailure::new(FailureKind::Execution, e.to_string()));
            }
        }
    }

    async fn format_results(&self, state: &mut SessionState, keep_alive: &dyn KeepAlive) {
        let situation = if !state.query_validated {
            Situation::ErrorSummary {
                kind: ErrorSituation::InvalidQuery,
            }
        } else if !state.query_executed {
            Situation::ErrorSummary {
                kind: ErrorSituation::StoreFailure,
            }
        } else {
            Situation::ResultsSummary {
                count: state.result_count().unwrap_or(0),
                filters: state.filters.clone(),
            }
        };
        let text = self.compose(&situation, state, keep_alive).await;
        state.add_message(Role::Assistant, text);
    }

    // ---- collaborator helpers ----

    /// Word `situation` with the composer, falling back to fixed text when the
    /// composer fails or returns nothing. Composer failures are not recorded
    /// as turn failures.
    async fn compose(
        &self,
        situation: &Situation,
        state: &SessionState,
        keep_alive: &dyn KeepAlive,
    ) -> String {
        keep_alive.keep_alive(&state.session_id);
        match self.bounded(self.collaborators.composer.compose(situation)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(
                    session_id = %state.session_id,
                    situation = situation.name(),
                    "Composer returned empty text; using fallback"
                );
                fallback_message(situation)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %state.session_id,
                    situation = situation.name(),
                    error = %e,
                    "Composer failed; using fallback"
                );
                fallback_message(situation)
            }
        }
    }

    /// Await a collaborator call under the configured timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        let limit = self.settings.collaborator_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout(limit.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwell_core::{FilterSet, PropertyStatus};

    fn complete() -> FilterSet {
        FilterSet {
            district: Some("Miraflores".into()),
            min_area: Some(80.0),
            status: Some(PropertyStatus::Finished),
            max_budget: Some(400_000.0),
            bedrooms: Some(2),
            ..Default::default()
        }
    }

    // ---- unconditional edges ----

    #[test]
    fn test_fixed_edges() {
        let state = SessionState::new("t");
        assert_eq!(transition(Node::ReceiveMessage, &state), Node::ExtractFilters);
        assert_eq!(transition(Node::ExtractFilters, &state), Node::CheckCompletion);
        assert_eq!(transition(Node::AskMissingFilter, &state), Node::End);
        assert_eq!(transition(Node::AskAdditional, &state), Node::End);
        assert_eq!(transition(Node::GenerateQuery, &state), Node::ValidateQuery);
        assert_eq!(transition(Node::ExecuteQuery, &state), Node::FormatResults);
        assert_eq!(transition(Node::FormatResults, &state), Node::End);
        assert_eq!(transition(Node::End, &state), Node::End);
    }

    // ---- check completion ----

    #[test]
    fn test_check_completion_incomplete_asks_missing() {
        let mut state = SessionState::new("t");
        state.flags.awaiting_optional_confirmation = true;
        assert_eq!(transition(Node::CheckCompletion, &state), Node::AskMissingFilter);
    }

    #[test]
    fn test_check_completion_complete_not_asked() {
        let mut state = SessionState::new("t");
        state.filters = complete();
        state.flags.essential_complete = true;
        assert_eq!(transition(Node::CheckCompletion, &state), Node::AskAdditional);
    }

    #[test]
    fn test_check_completion_complete_awaiting() {
        let mut state = SessionState::new("t");
        state.filters = complete();
        state.flags.essential_complete = true;
        state.flags.awaiting_optional_confirmation = true;
        assert_eq!(transition(Node::CheckCompletion, &state), Node::CollectOptional);
    }

    // ---- collect optional / validate ----

    #[test]
    fn test_collect_optional_routes_on_ready() {
        let mut state = SessionState::new("t");
        assert_eq!(transition(Node::CollectOptional, &state), Node::ExtractFilters);
        state.flags.ready_to_search = true;
        assert_eq!(transition(Node::CollectOptional, &state), Node::GenerateQuery);
    }

    #[test]
    fn test_validate_query_routes_on_validated() {
        let mut state = SessionState::new("t");
        assert_eq!(transition(Node::ValidateQuery, &state), Node::FormatResults);
        state.query_validated = true;
        assert_eq!(transition(Node::ValidateQuery, &state), Node::ExecuteQuery);
    }

    #[test]
    fn test_node_names() {
        assert_eq!(Node::AskMissingFilter.as_str(), "ask_missing_filter");
        assert_eq!(Node::FormatResults.to_string(), "format_results");
        assert_eq!(
            serde_json::to_string(&Node::CollectOptional).unwrap(),
            "\"collect_optional\""
        );
    }

    #[test]
    fn test_settings_from_config() {
        let settings = WorkflowSettings::from(&WorkflowConfig {
            max_query_attempts: 4,
            max_optional_filters: 2,
            collaborator_timeout_ms: 250,
        });
        assert_eq!(settings.max_query_attempts, 4);
        assert_eq!(settings.max_optional_filters, 2);
        assert_eq!(settings.collaborator_timeout, Duration::from_millis(250));
    }
}
