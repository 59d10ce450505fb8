//! Collaborator implementations backed by [`ChatClient`].

use async_trait::async_trait;
use serde_json::Value;

use dwell_core::{
    CollaboratorError, FilterExtractor, FilterPatch, FilterSet, QueryFixer, QuerySynthesizer,
    ResponseComposer, Situation,
};

use crate::client::{strip_code_fences, ChatClient};
use crate::prompts;

/// One chat model serving extraction, synthesis, repair and wording.
pub struct LlmAgent {
    client: ChatClient,
    default_limit: u32,
}

impl LlmAgent {
    /// `default_limit` is the row limit the synthesis prompts ask for.
    pub fn new(client: ChatClient, default_limit: u32) -> Self {
        Self {
            client,
            default_limit,
        }
    }

    async fn query_text(&self, system: &str, user: &str) -> Result<String, CollaboratorError> {
        let content = self.client.complete(system, user).await?;
        let query = strip_code_fences(&content);
        if query.is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "model returned an empty query".to_string(),
            ));
        }
        Ok(query)
    }
}

#[async_trait]
impl FilterExtractor for LlmAgent {
    async fn extract(
        &self,
        message: &str,
        current: &FilterSet,
    ) -> Result<FilterPatch, CollaboratorError> {
        let (system, user) = prompts::extraction(message, current);
        let content = self.client.complete(&system, &user).await?;
        parse_extraction(&content)
    }
}

#[async_trait]
impl QuerySynthesizer for LlmAgent {
    async fn synthesize(&self, filters: &FilterSet) -> Result<String, CollaboratorError> {
        let (system, user) = prompts::synthesis(filters, self.default_limit);
        self.query_text(&system, &user).await
    }
}

#[async_trait]
impl QueryFixer for LlmAgent {
    async fn fix(
        &self,
        original: &str,
        reason: &str,
        filters: &FilterSet,
    ) -> Result<String, CollaboratorError> {
        let (system, user) = prompts::fix(original, reason, filters, self.default_limit);
        self.query_text(&system, &user).await
    }
}

#[async_trait]
impl ResponseComposer for LlmAgent {
    async fn compose(&self, situation: &Situation) -> Result<String, CollaboratorError> {
        let (system, user) = prompts::compose(situation);
        Ok(self.client.complete(&system, &user).await?)
    }
}

/// Parse extraction output into a patch. Fields that fail normalisation are
/// dropped and logged; malformed JSON is an error.
pub fn parse_extraction(content: &str) -> Result<FilterPatch, CollaboratorError> {
    let text = strip_code_fences(content);
    let object = json_object_span(&text).ok_or_else(|| {
        CollaboratorError::InvalidResponse("extraction output has no JSON object".to_string())
    })?;
    let value: Value = serde_json::from_str(object)
        .map_err(|e| CollaboratorError::InvalidResponse(format!("extraction output: {}", e)))?;

    let (patch, rejected) = FilterPatch::from_json(&value);
    for field in &rejected {
        tracing::warn!(field = %field.field, reason = %field.reason, "Extracted value rejected");
    }
    Ok(patch)
}

/// Outermost `{ ... }` span, tolerating prose around the object.
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwell_core::PropertyStatus;

    // ---- extraction parsing ----

    #[test]
    fn test_parse_extraction_plain_json() {
        let patch =
            parse_extraction(r#"{"district": "san isidro", "bedrooms": 2, "status": "finished"}"#)
                .unwrap();
        assert_eq!(patch.district.as_deref(), Some("San Isidro"));
        assert_eq!(patch.bedrooms, Some(2));
        assert_eq!(patch.status, Some(PropertyStatus::Finished));
    }

    #[test]
    fn test_parse_extraction_fenced_with_prose() {
        let patch =
            parse_extraction("```json\nHere you go: {\"max_budget\": \"$500k\"}\n```").unwrap();
        assert_eq!(patch.max_budget, Some(500_000.0));
    }

    #[test]
    fn test_parse_extraction_drops_bad_fields() {
        let patch = parse_extraction(r#"{"min_area": -4, "balcony": true, "garden": true}"#).unwrap();
        assert_eq!(patch.min_area, None);
        assert_eq!(patch.balcony, Some(true));
    }

    #[test]
    fn test_parse_extraction_empty_object() {
        assert!(parse_extraction("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_extraction_rejects_non_json() {
        assert!(matches!(
            parse_extraction("I could not find any criteria."),
            Err(CollaboratorError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_extraction("{district: Surco}"),
            Err(CollaboratorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_json_object_span() {
        assert_eq!(json_object_span("x {\"a\": {\"b\": 1}} y"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(json_object_span("} {"), None);
        assert_eq!(json_object_span("none"), None);
    }
}
