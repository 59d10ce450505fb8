//! Search criteria collected over a conversation.
//!
//! A [`FilterSet`] holds five essential and five optional criteria, each
//! independently nullable. Collaborator output arrives as loosely-typed JSON
//! and is parsed into a [`FilterPatch`] by [`FilterPatch::from_json`], which
//! accepts only known field names and normalises every value before it can be
//! merged. The cap on simultaneously active optional filters is enforced by the
//! workflow that merges patches, not here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Enums
// =============================================================================

/// Construction phase of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyStatus {
    /// Sold from plans; construction not started.
    OffPlan,
    /// Building work in progress.
    UnderConstruction,
    /// Completed and ready to move in.
    Finished,
}

impl PropertyStatus {
    pub const ALL: [PropertyStatus; 3] = [
        PropertyStatus::OffPlan,
        PropertyStatus::UnderConstruction,
        PropertyStatus::Finished,
    ];

    /// Canonical stored form, as written to the listing store.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::OffPlan => "OFF_PLAN",
            PropertyStatus::UnderConstruction => "UNDER_CONSTRUCTION",
            PropertyStatus::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect();
        match key.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "off plan" | "offplan" | "plans" | "on plans" | "pre construction" | "planos" => {
                Ok(PropertyStatus::OffPlan)
            }
            "under construction" | "construction" | "in construction" | "building"
            | "construcción" | "construccion" => Ok(PropertyStatus::UnderConstruction),
            "finished" | "ready" | "completed" | "complete" | "move in ready" | "terminado" => {
                Ok(PropertyStatus::Finished)
            }
            _ => Err(format!(
                "unknown status '{}', expected one of OFF_PLAN, UNDER_CONSTRUCTION, FINISHED",
                s.trim()
            )),
        }
    }
}

/// One of the five criteria required before a query may be generated.
///
/// Variant order is the order in which missing criteria are asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EssentialFilter {
    District,
    MinArea,
    Status,
    MaxBudget,
    Bedrooms,
}

impl EssentialFilter {
    pub const ALL: [EssentialFilter; 5] = [
        EssentialFilter::District,
        EssentialFilter::MinArea,
        EssentialFilter::Status,
        EssentialFilter::MaxBudget,
        EssentialFilter::Bedrooms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EssentialFilter::District => "district",
            EssentialFilter::MinArea => "min_area",
            EssentialFilter::Status => "status",
            EssentialFilter::MaxBudget => "max_budget",
            EssentialFilter::Bedrooms => "bedrooms",
        }
    }
}

impl fmt::Display for EssentialFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the five non-required criteria.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalFilter {
    PetFriendly,
    Balcony,
    Terrace,
    Furnished,
    Bathrooms,
}

impl OptionalFilter {
    pub const ALL: [OptionalFilter; 5] = [
        OptionalFilter::PetFriendly,
        OptionalFilter::Balcony,
        OptionalFilter::Terrace,
        OptionalFilter::Furnished,
        OptionalFilter::Bathrooms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionalFilter::PetFriendly => "pet_friendly",
            OptionalFilter::Balcony => "balcony",
            OptionalFilter::Terrace => "terrace",
            OptionalFilter::Furnished => "furnished",
            OptionalFilter::Bathrooms => "bathrooms",
        }
    }
}

impl fmt::Display for OptionalFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FilterSet
// =============================================================================

/// Criteria collected so far for one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    // Essential
    pub district: Option<String>,
    pub min_area: Option<f64>,
    pub status: Option<PropertyStatus>,
    pub max_budget: Option<f64>,
    pub bedrooms: Option<u32>,

    // Optional
    pub pet_friendly: Option<bool>,
    pub balcony: Option<bool>,
    pub terrace: Option<bool>,
    pub furnished: Option<bool>,
    pub bathrooms: Option<u32>,
}

impl FilterSet {
    pub fn has_essential(&self, filter: EssentialFilter) -> bool {
        match filter {
            EssentialFilter::District => self.district.is_some(),
            EssentialFilter::MinArea => self.min_area.is_some(),
            EssentialFilter::Status => self.status.is_some(),
            EssentialFilter::MaxBudget => self.max_budget.is_some(),
            EssentialFilter::Bedrooms => self.bedrooms.is_some(),
        }
    }

    pub fn has_optional(&self, filter: OptionalFilter) -> bool {
        match filter {
            OptionalFilter::PetFriendly => self.pet_friendly.is_some(),
            OptionalFilter::Balcony => self.balcony.is_some(),
            OptionalFilter::Terrace => self.terrace.is_some(),
            OptionalFilter::Furnished => self.furnished.is_some(),
            OptionalFilter::Bathrooms => self.bathrooms.is_some(),
        }
    }

    pub fn essential_count(&self) -> usize {
        EssentialFilter::ALL
            .iter()
            .filter(|f| self.has_essential(**f))
            .count()
    }

    pub fn optional_count(&self) -> usize {
        OptionalFilter::ALL
            .iter()
            .filter(|f| self.has_optional(**f))
            .count()
    }

    /// Essential criteria still unset, in asking order.
    pub fn missing_essential(&self) -> Vec<EssentialFilter> {
        EssentialFilter::ALL
            .into_iter()
            .filter(|f| !self.has_essential(*f))
            .collect()
    }

    pub fn next_missing(&self) -> Option<EssentialFilter> {
        EssentialFilter::ALL
            .into_iter()
            .find(|f| !self.has_essential(*f))
    }

    pub fn is_complete(&self) -> bool {
        self.essential_count() == EssentialFilter::ALL.len()
    }

    pub fn is_empty(&self) -> bool {
        self.essential_count() == 0 && self.optional_count() == 0
    }

    /// JSON object containing only the criteria that are set.
    pub fn to_compact_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(v) = &self.district {
            map.insert("district".into(), Value::from(v.as_str()));
        }
        if let Some(v) = self.min_area {
            map.insert("min_area".into(), Value::from(v));
        }
        if let Some(v) = self.status {
            map.insert("status".into(), Value::from(v.as_str()));
        }
        if let Some(v) = self.max_budget {
            map.insert("max_budget".into(), Value::from(v));
        }
        if let Some(v) = self.bedrooms {
            map.insert("bedrooms".into(), Value::from(v));
        }
        if let Some(v) = self.pet_friendly {
            map.insert("pet_friendly".into(), Value::from(v));
        }
        if let Some(v) = self.balcony {
            map.insert("balcony".into(), Value::from(v));
        }
        if let Some(v) = self.terrace {
            map.insert("terrace".into(), Value::from(v));
        }
        if let Some(v) = self.furnished {
            map.insert("furnished".into(), Value::from(v));
        }
        if let Some(v) = self.bathrooms {
            map.insert("bathrooms".into(), Value::from(v));
        }
        Value::Object(map)
    }
}

// =============================================================================
// FilterPatch
// =============================================================================

/// A partial update to a [`FilterSet`]. `None` means "leave unchanged".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPatch {
    pub district: Option<String>,
    pub min_area: Option<f64>,
    pub status: Option<PropertyStatus>,
    pub max_budget: Option<f64>,
    pub bedrooms: Option<u32>,
    pub pet_friendly: Option<bool>,
    pub balcony: Option<bool>,
    pub terrace: Option<bool>,
    pub furnished: Option<bool>,
    pub bathrooms: Option<u32>,
}

/// A collaborator-supplied field that was dropped during parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedField {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for RejectedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl FilterPatch {
    /// Parse a collaborator's JSON object into a typed patch.
    ///
    /// Unknown keys and values that fail normalisation are reported in the
    /// returned list and left out of the patch. JSON `null` is treated as
    /// "not mentioned". A non-object input yields an empty patch and a single
    /// rejection.
    pub fn from_json(value: &Value) -> (FilterPatch, Vec<RejectedField>) {
        let mut patch = FilterPatch::default();
        let mut rejected = Vec::new();

        let Some(obj) = value.as_object() else {
            rejected.push(RejectedField {
                field: "<root>".to_string(),
                reason: "expected a JSON object".to_string(),
            });
            return (patch, rejected);
        };

        for (key, raw) in obj {
            if raw.is_null() {
                continue;
            }
            let outcome = match key.as_str() {
                "district" => normalize_district(raw).map(|v| patch.district = Some(v)),
                "min_area" => normalize_area(raw).map(|v| patch.min_area = Some(v)),
                "status" => normalize_status(raw).map(|v| patch.status = Some(v)),
                "max_budget" => normalize_budget(raw).map(|v| patch.max_budget = Some(v)),
                "bedrooms" => normalize_count(raw).map(|v| patch.bedrooms = Some(v)),
                "pet_friendly" => normalize_bool(raw).map(|v| patch.pet_friendly = Some(v)),
                "balcony" => normalize_bool(raw).map(|v| patch.balcony = Some(v)),
                "terrace" => normalize_bool(raw).map(|v| patch.terrace = Some(v)),
                "furnished" => normalize_bool(raw).map(|v| patch.furnished = Some(v)),
                "bathrooms" => normalize_count(raw).map(|v| patch.bathrooms = Some(v)),
                _ => Err("unknown field".to_string()),
            };
            if let Err(reason) = outcome {
                rejected.push(RejectedField {
                    field: key.clone(),
                    reason,
                });
            }
        }

        (patch, rejected)
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterPatch::default()
    }
}

// ---- value normalisation ----

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn normalize_district(raw: &Value) -> Result<String, String> {
    let s = raw.as_str().ok_or("must be a string")?;
    let cased = title_case(s);
    if cased.is_empty() {
        return Err("must not be empty".to_string());
    }
    Ok(cased)
}

fn positive(value: f64, what: &str) -> Result<f64, String> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{what} must be greater than 0"))
    }
}

fn normalize_area(raw: &Value) -> Result<f64, String> {
    let value = match raw {
        Value::Number(n) => n.as_f64().ok_or("area must be a number")?,
        Value::String(s) => {
            let cleaned = s
                .to_lowercase()
                .replace("m²", "")
                .replace("m2", "")
                .replace("sqm", "")
                .replace(',', "");
            cleaned
                .trim()
                .parse::<f64>()
                .map_err(|_| "area must be a valid number".to_string())?
        }
        _ => return Err("area must be a number".to_string()),
    };
    positive(value, "area")
}

fn normalize_budget(raw: &Value) -> Result<f64, String> {
    let value = match raw {
        Value::Number(n) => n.as_f64().ok_or("budget must be a number")?,
        Value::String(s) => {
            let lowered = s.to_lowercase().replace(['$', ','], "");
            let trimmed = lowered.trim();
            let (digits, multiplier) = if let Some(rest) = trimmed.strip_suffix("mil") {
                (rest, 1000.0)
            } else if let Some(rest) = trimmed.strip_suffix('k') {
                (rest, 1000.0)
            } else {
                (trimmed, 1.0)
            };
            digits
                .trim()
                .parse::<f64>()
                .map(|v| v * multiplier)
                .map_err(|_| "budget must be a valid number".to_string())?
        }
        _ => return Err("budget must be a number".to_string()),
    };
    positive(value, "budget")
}

fn normalize_count(raw: &Value) -> Result<u32, String> {
    let value = match raw {
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => u as f64,
            (None, Some(i), _) => i as f64,
            (None, None, Some(f)) if f.fract() == 0.0 => f,
            _ => return Err("must be a whole number".to_string()),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|v| v as f64)
            .map_err(|_| "must be a whole number".to_string())?,
        _ => return Err("must be a whole number".to_string()),
    };
    if value <= 0.0 {
        return Err("must be greater than 0".to_string());
    }
    if value > f64::from(u32::MAX) {
        return Err("is out of range".to_string());
    }
    Ok(value as u32)
}

fn normalize_bool(raw: &Value) -> Result<bool, String> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err("must be yes or no".to_string()),
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "si" | "sí" | "1" => Ok(true),
            "false" | "no" | "n" | "0" => Ok(false),
            _ => Err("must be yes or no".to_string()),
        },
        _ => Err("must be yes or no".to_string()),
    }
}

fn normalize_status(raw: &Value) -> Result<PropertyStatus, String> {
    raw.as_str()
        .ok_or_else(|| "status must be a string".to_string())?
        .parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_filters() -> FilterSet {
        FilterSet {
            district: Some("Miraflores".to_string()),
            min_area: Some(80.0),
            status: Some(PropertyStatus::Finished),
            max_budget: Some(500_000.0),
            bedrooms: Some(2),
            ..Default::default()
        }
    }

    // ---- counts and completion ----

    #[test]
    fn test_empty_filter_set() {
        let filters = FilterSet::default();
        assert_eq!(filters.essential_count(), 0);
        assert_eq!(filters.optional_count(), 0);
        assert!(filters.is_empty());
        assert!(!filters.is_complete());
        assert_eq!(filters.next_missing(), Some(EssentialFilter::District));
        assert_eq!(filters.missing_essential().len(), 5);
    }

    #[test]
    fn test_partial_filters_next_missing_in_order() {
        let filters = FilterSet {
            district: Some("District X".to_string()),
            bedrooms: Some(2),
            ..Default::default()
        };
        assert_eq!(filters.essential_count(), 2);
        assert_eq!(filters.next_missing(), Some(EssentialFilter::MinArea));
        assert_eq!(
            filters.missing_essential(),
            vec![
                EssentialFilter::MinArea,
                EssentialFilter::Status,
                EssentialFilter::MaxBudget
            ]
        );
    }

    #[test]
    fn test_complete_filters() {
        let mut filters = complete_filters();
        assert!(filters.is_complete());
        assert_eq!(filters.next_missing(), None);
        assert!(filters.missing_essential().is_empty());

        filters.balcony = Some(false);
        filters.bathrooms = Some(2);
        assert_eq!(filters.optional_count(), 2);
        assert_eq!(filters.essential_count(), 5);
    }

    #[test]
    fn test_compact_json_omits_unset_fields() {
        let filters = FilterSet {
            district: Some("Barranco".to_string()),
            status: Some(PropertyStatus::OffPlan),
            terrace: Some(true),
            ..Default::default()
        };
        assert_eq!(
            filters.to_compact_json(),
            json!({"district": "Barranco", "status": "OFF_PLAN", "terrace": true})
        );
    }

    // ---- status vocabulary ----

    #[test]
    fn test_status_parses_canonical_and_aliases() {
        let cases = [
            ("OFF_PLAN", PropertyStatus::OffPlan),
            ("off plan", PropertyStatus::OffPlan),
            ("Pre-construction", PropertyStatus::OffPlan),
            ("PLANOS", PropertyStatus::OffPlan),
            ("UNDER_CONSTRUCTION", PropertyStatus::UnderConstruction),
            ("in construction", PropertyStatus::UnderConstruction),
            ("Construcción", PropertyStatus::UnderConstruction),
            ("FINISHED", PropertyStatus::Finished),
            ("ready", PropertyStatus::Finished),
            ("  Completed ", PropertyStatus::Finished),
            ("terminado", PropertyStatus::Finished),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<PropertyStatus>(), Ok(expected), "input: {input}");
        }
    }

    #[test]
    fn test_status_rejects_occupancy_vocabulary() {
        assert!("AVAILABLE".parse::<PropertyStatus>().is_err());
        assert!("sold".parse::<PropertyStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&PropertyStatus::UnderConstruction).unwrap();
        assert_eq!(json, "\"UNDER_CONSTRUCTION\"");
        let parsed: PropertyStatus = serde_json::from_str("\"OFF_PLAN\"").unwrap();
        assert_eq!(parsed, PropertyStatus::OffPlan);
    }

    // ---- patch parsing ----

    #[test]
    fn test_patch_from_json_basic_fields() {
        let (patch, rejected) =
            FilterPatch::from_json(&json!({"district": "district x", "bedrooms": 2}));
        assert!(rejected.is_empty());
        assert_eq!(patch.district.as_deref(), Some("District X"));
        assert_eq!(patch.bedrooms, Some(2));
        assert_eq!(patch.min_area, None);
    }

    #[test]
    fn test_patch_from_json_empty_object() {
        let (patch, rejected) = FilterPatch::from_json(&json!({}));
        assert!(patch.is_empty());
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_patch_from_json_non_object() {
        let (patch, rejected) = FilterPatch::from_json(&json!(["district"]));
        assert!(patch.is_empty());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].field, "<root>");
    }

    #[test]
    fn test_patch_unknown_field_is_rejected() {
        let (patch, rejected) =
            FilterPatch::from_json(&json!({"pool": true, "balcony": "yes"}));
        assert_eq!(patch.balcony, Some(true));
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].field, "pool");
        assert_eq!(rejected[0].to_string(), "pool: unknown field");
    }

    #[test]
    fn test_patch_null_means_unchanged() {
        let (patch, rejected) = FilterPatch::from_json(&json!({"district": null}));
        assert!(patch.is_empty());
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_patch_area_strings_with_units() {
        for (input, expected) in [
            (json!("80m2"), 80.0),
            (json!("95.5 m²"), 95.5),
            (json!(120), 120.0),
            (json!("1,200"), 1200.0),
        ] {
            let (patch, rejected) = FilterPatch::from_json(&json!({ "min_area": input }));
            assert!(rejected.is_empty(), "rejected: {rejected:?}");
            assert_eq!(patch.min_area, Some(expected));
        }
    }

    #[test]
    fn test_patch_area_must_be_positive() {
        let (patch, rejected) = FilterPatch::from_json(&json!({"min_area": 0}));
        assert_eq!(patch.min_area, None);
        assert_eq!(rejected[0].reason, "area must be greater than 0");

        let (_, rejected) = FilterPatch::from_json(&json!({"min_area": "big"}));
        assert_eq!(rejected[0].reason, "area must be a valid number");
    }

    #[test]
    fn test_patch_budget_suffixes() {
        for (input, expected) in [
            (json!("$500k"), 500_000.0),
            (json!("500 mil"), 500_000.0),
            (json!("350,000"), 350_000.0),
            (json!(275000.5), 275_000.5),
        ] {
            let (patch, rejected) = FilterPatch::from_json(&json!({ "max_budget": input }));
            assert!(rejected.is_empty(), "rejected: {rejected:?}");
            assert_eq!(patch.max_budget, Some(expected));
        }

        let (_, rejected) = FilterPatch::from_json(&json!({"max_budget": -5}));
        assert_eq!(rejected[0].reason, "budget must be greater than 0");
    }

    #[test]
    fn test_patch_counts() {
        let (patch, rejected) = FilterPatch::from_json(&json!({"bedrooms": "3", "bathrooms": 2.0}));
        assert!(rejected.is_empty());
        assert_eq!(patch.bedrooms, Some(3));
        assert_eq!(patch.bathrooms, Some(2));

        let (patch, rejected) = FilterPatch::from_json(&json!({"bedrooms": 0, "bathrooms": 1.5}));
        assert_eq!(patch.bedrooms, None);
        assert_eq!(patch.bathrooms, None);
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_patch_booleans() {
        let (patch, rejected) = FilterPatch::from_json(&json!({
            "pet_friendly": "sí",
            "balcony": false,
            "terrace": 1,
            "furnished": "No",
        }));
        assert!(rejected.is_empty());
        assert_eq!(patch.pet_friendly, Some(true));
        assert_eq!(patch.balcony, Some(false));
        assert_eq!(patch.terrace, Some(true));
        assert_eq!(patch.furnished, Some(false));

        let (_, rejected) = FilterPatch::from_json(&json!({"furnished": "maybe"}));
        assert_eq!(rejected[0].reason, "must be yes or no");
    }

    #[test]
    fn test_patch_status_alias() {
        let (patch, rejected) = FilterPatch::from_json(&json!({"status": "under construction"}));
        assert!(rejected.is_empty());
        assert_eq!(patch.status, Some(PropertyStatus::UnderConstruction));

        let (patch, rejected) = FilterPatch::from_json(&json!({"status": "occupied"}));
        assert_eq!(patch.status, None);
        assert_eq!(rejected[0].field, "status");
    }

    #[test]
    fn test_title_case_district() {
        assert_eq!(title_case("  san   ISIDRO "), "San Isidro");
        assert_eq!(title_case("miraflores"), "Miraflores");
        let (_, rejected) = FilterPatch::from_json(&json!({"district": "   "}));
        assert_eq!(rejected[0].reason, "must not be empty");
    }
}
