//! Conversational search for dwell.
//!
//! Collects search criteria over a multi-turn dialogue, then synthesizes,
//! validates, and executes a listing query. Session state, the workflow
//! graph, and the service facade a transport talks to all live here.

pub mod error;
pub mod fallback;
pub mod graph;
pub mod intent;
pub mod merge;
pub mod retry;
pub mod service;
pub mod state;
pub mod store;
pub mod types;

pub use error::{ChatError, FailureKind, TurnFailure};
pub use graph::{transition, Collaborators, Node, Workflow, WorkflowSettings, MAX_NODE_VISITS};
pub use merge::{merge_patch, MergeReport};
pub use retry::{RetryCoordinator, RetryOutcome};
pub use service::SearchService;
pub use state::{ConversationFlags, Message, Role, SessionState};
pub use store::{KeepAlive, SessionStore};
pub use types::{FilterSnapshot, ResetAck, SearchResults, SessionInfo, TurnReply};
