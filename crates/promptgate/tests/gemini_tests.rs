//! Integration tests for the Gemini REST provider
//!
//! A wiremock server stands in for the generative-language API. Tests hit
//! the provider directly and through the full router.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{
    body_partial_json, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use promptgate::config::{Config, ProviderConfig};
use promptgate::gateway::{AppState, BasicAuth, create_router};
use promptgate::provider::{GeminiProvider, GenerationRequest, GenerativeProvider, ProviderError};

fn provider_for(server: &MockServer) -> GeminiProvider {
    let config = ProviderConfig {
        base_url: server.uri(),
        ..ProviderConfig::default()
    };
    GeminiProvider::new(&config, Duration::from_secs(5)).unwrap()
}

fn text_candidate(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP",
            "safetyRatings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "probability": "NEGLIGIBLE"}
            ]
        }]
    })
}

// =============================================================================
// generateContent
// =============================================================================

#[tokio::test]
async fn test_generate_sends_prompt_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"parts": [{"text": "Hello"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_candidate("Hi!")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let response = provider
        .generate(&GenerationRequest::new("Hello", "gemini-1.5-flash", "test-key"))
        .await
        .unwrap();

    assert_eq!(response.text(), "Hi!");
    assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
}

#[tokio::test]
async fn test_generate_accepts_prefixed_model_name() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_candidate("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let response = provider
        .generate(&GenerationRequest::new("x", "models/gemini-pro", "k"))
        .await
        .unwrap();

    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_generate_429_is_quota() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .generate(&GenerationRequest::new("x", "gemini-pro", "k"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ProviderError::Quota("Resource has been exhausted (e.g. check quota).".to_string())
    );
}

#[tokio::test]
async fn test_generate_invalid_key_is_other_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .generate(&GenerationRequest::new("x", "gemini-pro", "bad"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ProviderError::Other("400 API key not valid. Please pass a valid API key.".to_string())
    );
}

#[tokio::test]
async fn test_generate_unreachable_provider_is_other_error() {
    let config = ProviderConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        ..ProviderConfig::default()
    };
    let provider = GeminiProvider::new(&config, Duration::from_secs(2)).unwrap();

    let err = provider
        .generate(&GenerationRequest::new("x", "gemini-pro", "k"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Other(_)));
}

// =============================================================================
// models.list
// =============================================================================

#[tokio::test]
async fn test_list_models_follows_page_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param_is_missing("pageToken"))
        .and(header("x-goog-api-key", "k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                {"name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"]}
            ],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let models = provider.list_models("k").await.unwrap();

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "models/gemini-1.5-pro");
    assert!(models[0].supports_generation());
    assert!(!models[1].supports_generation());
}

#[tokio::test]
async fn test_list_models_stops_on_repeated_page_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                {"name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"]}
            ],
            "nextPageToken": "same"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = tokio::time::timeout(Duration::from_secs(5), provider.list_models("k"))
        .await
        .expect("listing should terminate")
        .unwrap_err();

    match err {
        ProviderError::Other(message) => assert!(message.contains("repeated page token 'same'")),
        other => panic!("unexpected error: {other:?}"),
    }
}

// =============================================================================
// Full relay through the router
// =============================================================================

async fn relay(
    server: &MockServer,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let static_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.server.static_dir = static_dir.path().to_path_buf();

    let state = Arc::new(AppState {
        config,
        provider: Arc::new(provider_for(server)),
        server_credential: None,
        auth: BasicAuth::Disabled,
    });

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_relay_generate_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "client-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{
                    "text": "[REPLY_START]Rust is a systems language.[REPLY_END][QUESTIONS_START]What about async?[QUESTIONS_END]"
                }]},
                "finishReason": "STOP",
                "citationMetadata": {"citationSources": [
                    {"startIndex": 0, "endIndex": 10, "uri": "https://www.rust-lang.org/"}
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let (status, json) = relay(
        &server,
        "/generate",
        serde_json::json!({"prompt": "Tell me about Rust", "modelName": "gemini-1.5-flash", "apiKey": "client-key"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({
            "reply": "Rust is a systems language.",
            "citations": ["https://www.rust-lang.org/"],
            "additionalQuestions": "What about async?"
        })
    );
}

#[tokio::test]
async fn test_relay_blocked_prompt_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "safetyRatings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "probability": "HIGH"},
                    {"category": "HARM_CATEGORY_HATE_SPEECH", "probability": "NEGLIGIBLE"}
                ]
            }]
        })))
        .mount(&server)
        .await;

    let (status, json) = relay(
        &server,
        "/generate",
        serde_json::json!({"prompt": "x", "modelName": "gemini-pro", "apiKey": "k"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errorCode"], "BLOCKED_RESPONSE");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("(Finish Reason: SAFETY)"));
    assert!(message.contains("(Safety Ratings: HARM_CATEGORY_HARASSMENT: HIGH)"));
}

#[tokio::test]
async fn test_relay_blocked_prompt_reports_block_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": {
                "blockReason": "SAFETY",
                "safetyRatings": [
                    {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "HIGH"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let (status, json) = relay(
        &server,
        "/generate",
        serde_json::json!({"prompt": "x", "modelName": "gemini-pro", "apiKey": "k"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errorCode"], "BLOCKED_RESPONSE");
    let message = json["error"].as_str().unwrap();
    assert!(message.ends_with("(Block Reason: SAFETY)"));
    assert!(!message.contains("Finish Reason"));
}

#[tokio::test]
async fn test_relay_quota_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let (status, json) = relay(
        &server,
        "/generate",
        serde_json::json!({"prompt": "x", "modelName": "gemini-pro", "apiKey": "k"}),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["errorCode"], "QUOTA_EXCEEDED");
    assert_eq!(json["error"], "Quota exceeded for this model.");
}

#[tokio::test]
async fn test_relay_models_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                {"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}
            ]
        })))
        .mount(&server)
        .await;

    let (status, json) = relay(&server, "/models", serde_json::json!({"apiKey": "k"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"models": ["models/gemini-1.5-flash"]}));
}
