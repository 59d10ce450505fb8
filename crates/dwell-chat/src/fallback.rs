//! Deterministic wording used whenever the response composer fails.
//!
//! Every situation the workflow can ask the composer about has a fixed
//! message here, so a turn always ends with something the user can read.

use dwell_core::{EssentialFilter, ErrorSituation, Situation};

/// Assistant notice appended when the optional-criteria cap ends collection.
pub fn optional_cap_notice(max_optional: usize) -> String {
    format!(
        "Got it. You already have {} additional filters, so I'll go ahead with the search.",
        max_optional
    )
}

/// Reply for a missing-filter turn that finds every essential already set.
pub fn nothing_missing_notice() -> &'static str {
    "It looks like I already have everything I need."
}

/// Fixed message for `situation`.
pub fn fallback_message(situation: &Situation) -> String {
    match situation {
        Situation::MissingFilter { filter, .. } => missing_filter_question(*filter).to_string(),
        Situation::AdditionalFilters { .. } => "Great, I have all the basic information. Would you like to add \
             any extra filters (pet-friendly, balcony, terrace, furnished, number of bathrooms) \
             or should I search with these criteria?"
            .to_string(),
        Situation::ResultsSummary { count, .. } => results_summary(*count),
        Situation::ErrorSummary { kind } => error_summary(*kind).to_string(),
    }
}

fn missing_filter_question(filter: EssentialFilter) -> &'static str {
    match filter {
        EssentialFilter::District => "Which district would you like to search in?",
        EssentialFilter::MinArea => "What is the minimum area you need (in m²)?",
        EssentialFilter::Status => {
            "Which stage do you prefer: off-plan, under construction, or finished?"
        }
        EssentialFilter::MaxBudget => "What is your maximum budget?",
        EssentialFilter::Bedrooms => "How many bedrooms do you need?",
    }
}

fn results_summary(count: usize) -> String {
    match count {
        0 => "Sorry, I couldn't find any properties matching those criteria. \
              Would you like to adjust a filter?"
            .to_string(),
        1 => "I found 1 apartment that matches your criteria!".to_string(),
        n => format!(
            "I found {} apartments that match your criteria! You can see the details below.",
            n
        ),
    }
}

fn error_summary(kind: ErrorSituation) -> &'static str {
    match kind {
        ErrorSituation::InvalidQuery => {
            "Sorry, there was a problem building the search. Could you rephrase your criteria?"
        }
        ErrorSituation::StoreFailure => {
            "There was a problem searching the listings. Please try again."
        }
    }
}
