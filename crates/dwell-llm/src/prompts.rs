//! Prompt builders for the generative collaborators.
//!
//! Each builder returns the system prompt and the user prompt for one call.

use dwell_core::{EssentialFilter, ErrorSituation, FilterSet, Situation};

/// Listing schema as the SQL prompts describe it.
pub const LISTING_SCHEMA: &str = "\
Table building (alias b)
- id TEXT PRIMARY KEY
- name TEXT
- address TEXT
- district TEXT
- city TEXT

Table property (alias p)
- id TEXT PRIMARY KEY
- building_id TEXT REFERENCES building(id)
- unit_number TEXT
- floor INTEGER
- kind TEXT
- area REAL (square metres)
- bedrooms INTEGER
- bathrooms INTEGER
- balcony INTEGER (0 or 1)
- terrace INTEGER (0 or 1)
- furnished INTEGER (0 or 1)
- pet_friendly INTEGER (0 or 1)
- price REAL
- monthly_fee REAL
- status TEXT, one of 'OFF_PLAN', 'UNDER_CONSTRUCTION', 'FINISHED'";

const EXTRACTION_SYSTEM: &str = "\
You extract apartment search criteria from a user's message.
Return ONLY a JSON object containing the criteria the message mentions. Use these keys:
- district: district name, capitalised (\"san isidro\" -> \"San Isidro\")
- min_area: minimum area in square metres as a number (\"80m2\" -> 80)
- status: one of OFF_PLAN, UNDER_CONSTRUCTION, FINISHED
- max_budget: maximum price as a number without symbols (\"$500k\" -> 500000)
- bedrooms: number of bedrooms as an integer
- pet_friendly, balcony, terrace, furnished: true or false
- bathrooms: number of bathrooms as an integer
Do not repeat criteria that are already collected unless the user changes them.
If the message contains no criteria, return {}.
No explanations, no Markdown.";

const COMPOSER_SYSTEM: &str = "\
You are a friendly real-estate assistant helping someone find an apartment.
Write one short, natural reply for the situation described. Do not use lists.
Use at most one emoji. Reply with the message text only.";

fn filters_json(filters: &FilterSet) -> String {
    serde_json::to_string_pretty(&filters.to_compact_json()).unwrap_or_else(|_| "{}".to_string())
}

/// Prompts for turning `message` into a partial filter update.
pub fn extraction(message: &str, current: &FilterSet) -> (String, String) {
    let user = format!(
        "Criteria already collected:\n{}\n\nUser message: \"{}\"",
        filters_json(current),
        message
    );
    (EXTRACTION_SYSTEM.to_string(), user)
}

fn sql_system(limit: u32) -> String {
    format!(
        "You write one SQLite SELECT statement that searches apartment listings.\n\n\
         {schema}\n\n\
         Rules:\n\
         1. Always join: FROM property p JOIN building b ON p.building_id = b.id\n\
         2. district filters b.district with =\n\
         3. min_area filters p.area with >=\n\
         4. max_budget filters p.price with <=\n\
         5. status, bedrooms, bathrooms filter the property column of the same name with =\n\
         6. pet_friendly, balcony, terrace, furnished compare with = 1 or = 0\n\
         7. Select p.*, b.name AS building_name, b.address AS building_address, b.district AS building_district\n\
         8. End with LIMIT {limit}\n\
         9. A single SELECT only. No comments, no semicolons, no Markdown.",
        schema = LISTING_SCHEMA,
        limit = limit
    )
}

/// Prompts for writing a search query from the collected criteria.
pub fn synthesis(filters: &FilterSet, limit: u32) -> (String, String) {
    let user = format!("Search criteria:\n{}", filters_json(filters));
    (sql_system(limit), user)
}

/// Prompts for repairing a rejected query.
pub fn fix(original: &str, reason: &str, filters: &FilterSet, limit: u32) -> (String, String) {
    let previous = if original.trim().is_empty() {
        "(no query was produced)".to_string()
    } else {
        original.to_string()
    };
    let user = format!(
        "The previous query was rejected.\n\nQuery:\n{}\n\nReason: {}\n\n\
         Search criteria:\n{}\n\nWrite a corrected query.",
        previous,
        reason,
        filters_json(filters)
    );
    (sql_system(limit), user)
}

/// Prompts for wording the reply to `situation`.
pub fn compose(situation: &Situation) -> (String, String) {
    let user = match situation {
        Situation::MissingFilter { filter, filters } => format!(
            "Ask the user for this missing criterion: {}.\n{}\n\
             Criteria already collected:\n{}\n\
             Keep it under 15 words.",
            filter,
            missing_hint(*filter),
            filters_json(filters)
        ),
        Situation::AdditionalFilters { filters } => format!(
            "All required criteria are collected:\n{}\n\
             Ask whether they want extra filters (pet-friendly, balcony, terrace, furnished, \
             number of bathrooms) or to search now. Keep it under 30 words.",
            filters_json(filters)
        ),
        Situation::ResultsSummary { count, filters } => format!(
            "A search with these criteria:\n{}\nfound {} apartment(s).\n\
             Tell the user how many were found and that the details are listed below. \
             If none were found, suggest adjusting a filter. Keep it under 25 words.",
            filters_json(filters),
            count
        ),
        Situation::ErrorSummary { kind } => match kind {
            ErrorSituation::InvalidQuery => "The search could not be built from the criteria. \
                 Apologise briefly and ask the user to rephrase."
                .to_string(),
            ErrorSituation::StoreFailure => "The listing search failed. \
                 Apologise briefly and ask the user to try again."
                .to_string(),
        },
    };
    (COMPOSER_SYSTEM.to_string(), user)
}

fn missing_hint(filter: EssentialFilter) -> &'static str {
    match filter {
        EssentialFilter::District => "Example: \"Which district would you like to live in?\"",
        EssentialFilter::MinArea => "Example: \"What's the minimum area you need, in m²?\"",
        EssentialFilter::Status => {
            "Mention the options: off-plan, under construction, or finished."
        }
        EssentialFilter::MaxBudget => "Example: \"What's your maximum budget?\"",
        EssentialFilter::Bedrooms => "Example: \"How many bedrooms do you need?\"",
    }
}
