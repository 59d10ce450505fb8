//! Minimal OpenAI-compatible chat-completions client.

use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;

use dwell_core::config::LlmConfig;

use crate::error::LlmError;

/// Sends one system + user exchange and returns the assistant's text.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    url: String,
    model: String,
    temperature: f32,
    headers: HeaderMap,
    timeout_ms: u64,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            url: format!("{}{}", config.api_base.trim_end_matches('/'), config.path),
            model: config.model.clone(),
            temperature: config.temperature,
            headers: auth_headers(&config.api_key)?,
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one completion and return the message content with surrounding
    /// whitespace removed.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let res = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let json: Value = res
            .error_for_status()?
            .json()
            .await
            .map_err(|e| self.classify(e))?;

        let content = parse_content(&json)?;
        tracing::debug!(model = %self.model, chars = content.len(), "Completion received");
        Ok(content)
    }

    fn classify(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout_ms)
        } else {
            LlmError::Http(err)
        }
    }
}

/// Bearer authorization, omitted when no key is configured (local servers).
pub fn auth_headers(api_key: &str) -> Result<HeaderMap, LlmError> {
    let mut headers = HeaderMap::new();
    if !api_key.trim().is_empty() {
        headers.insert(AUTHORIZATION, format!("Bearer {}", api_key.trim()).parse()?);
    }
    Ok(headers)
}

/// Text of the first choice in a chat-completions response.
pub fn parse_content(json: &Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| LlmError::invalid_response("completion response has no message content"))
}

/// Remove a surrounding Markdown code fence (with or without a language tag).
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = match rest.find('\n') {
        Some(newline) if rest[..newline].chars().all(|c| c.is_ascii_alphanumeric()) => {
            &rest[newline + 1..]
        }
        _ => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
        .to_string()
}
