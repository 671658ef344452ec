use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::normalizer::{ParsedReply, normalize};
use crate::provider::GenerationRequest;

use super::error::{ApiError, MISSING_API_KEY, MISSING_GENERATE_FIELDS};
use super::server::AppState;

/// `POST /generate` body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub prompt: Option<String>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
}

/// `POST /models` body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsBody {
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelsReply {
    pub models: Vec<String>,
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ParsedReply>, ApiError> {
    let body: GenerateBody = serde_json::from_slice(&body)
        .map_err(|_| ApiError::Validation(MISSING_GENERATE_FIELDS.to_string()))?;

    let (Some(prompt), Some(model)) = (non_empty(body.prompt), non_empty(body.model_name)) else {
        return Err(ApiError::Validation(MISSING_GENERATE_FIELDS.to_string()));
    };

    let credential = resolve_credential(&state, body.api_key)?;
    let request = GenerationRequest::new(prompt, model, credential);
    let request_id = Uuid::new_v4();

    tracing::info!(
        %request_id,
        provider = state.provider.name(),
        model = %request.model,
        prompt_chars = request.prompt.chars().count(),
        "Generating content"
    );

    let outcome = state.provider.generate(&request).await;

    match normalize(outcome) {
        Ok(reply) => {
            tracing::debug!(
                %request_id,
                reply_chars = reply.reply_text.chars().count(),
                citations = reply.citations.len(),
                "Generation succeeded"
            );
            Ok(Json(reply))
        }
        Err(e) => {
            let err = ApiError::from(e);
            log_failure(&request_id, &err);
            Err(err)
        }
    }
}

pub async fn models_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ModelsReply>, ApiError> {
    let body: ModelsBody = serde_json::from_slice(&body).unwrap_or_default();
    let credential = resolve_credential(&state, body.api_key)?;

    let models = state.provider.list_models(&credential).await.map_err(|e| {
        tracing::error!(error = %e, "An error occurred while listing models");
        ApiError::Provider(format!("Failed to list models: {e}"))
    })?;

    let models: Vec<String> = models
        .into_iter()
        .filter(|m| m.supports_generation())
        .map(|m| m.name)
        .collect();

    tracing::debug!("Listed {} generation-capable models", models.len());
    Ok(Json(ModelsReply { models }))
}

/// Server-side credential wins; otherwise the request must carry one
fn resolve_credential(state: &AppState, api_key: Option<String>) -> Result<String, ApiError> {
    state
        .server_credential
        .clone()
        .or_else(|| non_empty(api_key))
        .ok_or_else(|| ApiError::Validation(MISSING_API_KEY.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn log_failure(request_id: &Uuid, err: &ApiError) {
    match err.category() {
        "provider" => {
            tracing::error!(%request_id, error = %err, "Provider call failed");
        }
        _ => {
            tracing::warn!(
                %request_id,
                category = err.category(),
                error = %err,
                "Generation returned no reply"
            );
        }
    }
}
