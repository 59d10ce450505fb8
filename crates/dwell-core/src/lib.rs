pub mod collaborator;
pub mod config;
pub mod error;
pub mod filters;
pub mod guard;
pub mod logging;

pub use collaborator::{
    CollaboratorError, ErrorSituation, ExecutionResult, FilterExtractor, QueryExecutor,
    QueryFixer, QuerySynthesizer, Record, ResponseComposer, Situation,
};
pub use config::DwellConfig;
pub use error::{DwellError, Result};
pub use filters::{
    EssentialFilter, FilterPatch, FilterSet, OptionalFilter, PropertyStatus, RejectedField,
};
pub use guard::{QueryGuard, QueryVerdict, Rejection};
