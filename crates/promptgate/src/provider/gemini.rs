//! Gemini REST provider
//!
//! Implements [`GenerativeProvider`] against the public
//! `generativelanguage.googleapis.com` API. The API key travels in the
//! `x-goog-api-key` header of each request, so concurrent calls with
//! different keys never share state.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ProviderConfig;
use crate::error::{GateError, Result};

use super::GenerativeProvider;
use super::types::{
    Candidate, CitationSource, GenerationRequest, ModelInfo, ProviderError, ProviderResponse,
    SafetyRating,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";
const MODELS_PAGE_SIZE: u32 = 1000;
const MAX_MODEL_PAGES: usize = 100;

/// Gemini provider over HTTP
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_version: String,
}

/// generateContent request body
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<WireSafetyRating>,
    citation_metadata: Option<WireCitationMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

/// Non-text parts (inline data, function calls) deserialize with `text: None`
#[derive(Debug, Deserialize)]
struct WirePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSafetyRating {
    category: String,
    probability: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCitationMetadata {
    #[serde(alias = "citations")]
    citation_sources: Option<Vec<WireCitationSource>>,
}

#[derive(Debug, Deserialize)]
struct WireCitationSource {
    uri: Option<String>,
}

/// models.list response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<WireModel>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GeminiProvider {
    /// Create a provider with its own HTTP client
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Provider(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(config, client))
    }

    /// Create a provider that reuses an existing HTTP client
    pub fn with_client(config: &ProviderConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.trim_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, ProviderError> {
        let raw = format!("{}/{}/{}", self.base_url, self.api_version, path);
        Url::parse(&raw)
            .map_err(|e| ProviderError::Other(format!("Invalid provider URL '{raw}': {e}")))
    }

    async fn send_json<T>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<T, ProviderError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_response(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Other(format!("Failed to parse provider response: {e}")))
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = self.endpoint(&format!("{}:generateContent", model_path(&request.model)))?;
        debug!("Calling generateContent at: {}", url);

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: &request.prompt,
                }],
            }],
        };

        let wire: GenerateContentResponse = self
            .send_json(
                self.client
                    .post(url)
                    .header(API_KEY_HEADER, &request.credential)
                    .json(&body),
            )
            .await?;

        Ok(wire.into_provider_response())
    }

    async fn list_models(
        &self,
        credential: &str,
    ) -> std::result::Result<Vec<ModelInfo>, ProviderError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        for _ in 0..MAX_MODEL_PAGES {
            let mut url = self.endpoint("models")?;
            url.query_pairs_mut()
                .append_pair("pageSize", &MODELS_PAGE_SIZE.to_string());
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            debug!("Listing models at: {}", url);

            let page: ListModelsResponse = self
                .send_json(self.client.get(url).header(API_KEY_HEADER, credential))
                .await?;

            models.extend(page.models.into_iter().map(|m| ModelInfo {
                name: m.name,
                supported_generation_methods: m.supported_generation_methods,
            }));

            let Some(token) = page.next_page_token.filter(|t| !t.is_empty()) else {
                return Ok(models);
            };
            if !seen_tokens.insert(token.clone()) {
                return Err(ProviderError::Other(format!(
                    "Model listing repeated page token '{token}'"
                )));
            }
            page_token = Some(token);
        }

        Err(ProviderError::Other(format!(
            "Model listing exceeded {MAX_MODEL_PAGES} pages"
        )))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

impl GenerateContentResponse {
    /// Convert the wire response, reading content and citations from the
    /// first candidate only
    fn into_provider_response(self) -> ProviderResponse {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let mut candidates = self.candidates.into_iter();
        let Some(first) = candidates.next() else {
            return ProviderResponse {
                block_reason,
                ..ProviderResponse::default()
            };
        };

        let parts = first
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let citation_sources = first
            .citation_metadata
            .and_then(|m| m.citation_sources)
            .map(|sources| {
                sources
                    .into_iter()
                    .map(|s| CitationSource { uri: s.uri })
                    .collect()
            });

        let first_candidate = Candidate {
            finish_reason: first.finish_reason,
            safety_ratings: convert_ratings(first.safety_ratings),
        };

        let candidates = std::iter::once(first_candidate)
            .chain(candidates.map(|c| Candidate {
                finish_reason: c.finish_reason,
                safety_ratings: convert_ratings(c.safety_ratings),
            }))
            .collect();

        ProviderResponse {
            parts,
            candidates,
            citation_sources,
            block_reason,
        }
    }
}

fn convert_ratings(ratings: Vec<WireSafetyRating>) -> Vec<SafetyRating> {
    ratings
        .into_iter()
        .map(|r| SafetyRating::new(r.category, r.probability))
        .collect()
}

/// Resource path for a model name, accepting both `gemini-pro` and
/// `models/gemini-pro`
fn model_path(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Other(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::Other(format!("Failed to connect to provider: {e}"))
    } else {
        ProviderError::Other(format!("Request failed: {e}"))
    }
}

/// Map a non-success HTTP response onto a tagged provider error
fn map_error_response(status: StatusCode, body: &str) -> ProviderError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let message = match &envelope {
        Some(e) if !e.error.message.is_empty() => e.error.message.clone(),
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    };

    let exhausted = envelope
        .as_ref()
        .is_some_and(|e| e.error.status == QUOTA_STATUS);

    if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
        ProviderError::Quota(message)
    } else {
        ProviderError::Other(format!("{} {}", status.as_u16(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ProviderResponse {
        serde_json::from_value::<GenerateContentResponse>(value)
            .unwrap()
            .into_provider_response()
    }

    #[test]
    fn test_model_path_prefixes_bare_names() {
        assert_eq!(model_path("gemini-1.5-flash"), "models/gemini-1.5-flash");
        assert_eq!(model_path("models/gemini-pro"), "models/gemini-pro");
        assert_eq!(model_path("tunedModels/my-model"), "tunedModels/my-model");
    }

    #[test]
    fn test_convert_text_parts_and_citations() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "world"}]},
                "finishReason": "STOP",
                "safetyRatings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "probability": "NEGLIGIBLE"}
                ],
                "citationMetadata": {
                    "citationSources": [
                        {"uri": "https://a.example", "startIndex": 0},
                        {"startIndex": 4},
                        {"uri": "https://b.example"}
                    ]
                }
            }]
        }));

        assert_eq!(response.text(), "Hello world");
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
        let sources = response.citation_sources.unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[1].uri, None);
    }

    #[test]
    fn test_convert_accepts_legacy_citations_key() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "x"}]},
                "citationMetadata": {"citations": [{"uri": "https://legacy.example"}]}
            }]
        }));

        let sources = response.citation_sources.unwrap();
        assert_eq!(sources[0].uri.as_deref(), Some("https://legacy.example"));
    }

    #[test]
    fn test_convert_blocked_candidate_has_no_parts() {
        let response = parse(json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "safetyRatings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "probability": "HIGH"}
                ]
            }]
        }));

        assert!(response.is_empty());
        assert_eq!(response.candidates[0].safety_ratings[0].probability, "HIGH");
        assert!(response.citation_sources.is_none());
    }

    #[test]
    fn test_convert_blocked_prompt_has_no_candidates() {
        let response = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(response.is_empty());
        assert!(response.candidates.is_empty());
        assert_eq!(response.block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn test_convert_skips_non_text_parts() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [
                    {"inlineData": {"mimeType": "image/png", "data": ""}},
                    {"text": "caption"}
                ]}
            }]
        }));

        assert_eq!(response.parts, vec!["caption".to_string()]);
    }

    #[test]
    fn test_map_error_429_is_quota() {
        let err = map_error_response(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, ProviderError::Quota(_)));
    }

    #[test]
    fn test_map_error_resource_exhausted_status_is_quota() {
        let body = json!({
            "error": {"code": 400, "message": "Out of quota", "status": "RESOURCE_EXHAUSTED"}
        })
        .to_string();

        let err = map_error_response(StatusCode::BAD_REQUEST, &body);
        assert_eq!(err, ProviderError::Quota("Out of quota".to_string()));
    }

    #[test]
    fn test_map_error_other_status_keeps_message() {
        let body = json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        })
        .to_string();

        let err = map_error_response(StatusCode::BAD_REQUEST, &body);
        assert_eq!(err, ProviderError::Other("400 API key not valid".to_string()));
    }

    #[test]
    fn test_map_error_plain_body() {
        let err = map_error_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err, ProviderError::Other("502 upstream down".to_string()));
    }
}
