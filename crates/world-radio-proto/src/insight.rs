//! Short generated facts about a country's music scene, via the Gemini
//! `generateContent` REST endpoint.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::InsightConfig;

pub const MISSING_KEY_MESSAGE: &str = "API Key not configured for cultural insights.";

#[async_trait]
pub trait InsightSource: Send + Sync {
    /// Display text for `country_name`. Always non-empty; failures come back
    /// as a neutral fallback sentence.
    async fn get_insight(&self, country_name: &str) -> String;
}

pub fn prompt_for(country_name: &str) -> String {
    format!(
        "Tell me a fascinating, brief (under 60 words) cultural fact about the music scene or radio history of {country_name}. Keep it engaging and casual."
    )
}

/// Used when the model answers with no text.
pub fn empty_fallback(country_name: &str) -> String {
    format!("Enjoy the music from {country_name}!")
}

/// Used when the request fails for any reason.
pub fn failure_fallback(country_name: &str) -> String {
    format!("Discover the sounds of {country_name}.")
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, `None` when blank.
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct InsightClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl InsightClient {
    /// Credential from config or environment.
    pub fn new(config: &InsightConfig) -> anyhow::Result<Self> {
        Self::with_api_key(config, config.resolved_api_key())
    }

    pub fn with_api_key(config: &InsightConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building insight HTTP client")?;
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn try_get_insight(&self, api_key: &str, country_name: &str) -> anyhow::Result<Option<String>> {
        let prompt = prompt_for(country_name);
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &prompt }],
            }],
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .context("sending generateContent request")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("generateContent returned {status}");
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .context("decoding generateContent response")?;
        Ok(parsed.text())
    }
}

#[async_trait]
impl InsightSource for InsightClient {
    async fn get_insight(&self, country_name: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return MISSING_KEY_MESSAGE.to_string();
        };
        match self.try_get_insight(api_key, country_name).await {
            Ok(Some(text)) => {
                debug!("insight for {}: {} chars", country_name, text.len());
                text
            }
            Ok(None) => empty_fallback(country_name),
            Err(e) => {
                warn!("insight for {} failed: {:#}", country_name, e);
                failure_fallback(country_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Option<String> {
        serde_json::from_str::<GenerateResponse>(json).unwrap().text()
    }

    #[test]
    fn joins_parts_of_first_candidate() {
        let text = parse(
            r#"{"candidates": [
                {"content": {"parts": [{"text": " Fado was born "}, {"text": "in Lisbon. "}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]}"#,
        );
        assert_eq!(text.as_deref(), Some("Fado was born in Lisbon."));
    }

    #[test]
    fn blank_or_missing_text_is_none() {
        assert_eq!(parse(r#"{"candidates": []}"#), None);
        assert_eq!(parse(r#"{}"#), None);
        assert_eq!(parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#), None);
        assert_eq!(parse(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#), None);
    }

    #[test]
    fn prompt_names_the_country() {
        let p = prompt_for("Mali");
        assert!(p.contains("radio history of Mali."));
        assert!(p.contains("under 60 words"));
    }

    #[tokio::test]
    async fn missing_key_returns_fixed_message() {
        let client = InsightClient::with_api_key(&InsightConfig::default(), None).unwrap();
        assert!(!client.has_credential());
        assert_eq!(client.get_insight("Japan").await, MISSING_KEY_MESSAGE);
    }
}
