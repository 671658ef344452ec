//! Test utilities for promptgate
//!
//! [`MockProvider`] answers every call with a canned outcome and records
//! what it was asked, so handler tests never touch the network.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::provider::{
    GenerationRequest, GenerativeProvider, ModelInfo, ProviderError, ProviderResponse,
};

/// Canned [`GenerativeProvider`] for router and handler tests
#[derive(Debug)]
pub struct MockProvider {
    generate_outcome: Result<ProviderResponse, ProviderError>,
    models_outcome: Result<Vec<ModelInfo>, ProviderError>,
    requests: Mutex<Vec<GenerationRequest>>,
    model_credentials: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Provider that replies with plain text `ok` and lists no models
    pub fn new() -> Self {
        Self {
            generate_outcome: Ok(ProviderResponse::from_text("ok")),
            models_outcome: Ok(Vec::new()),
            requests: Mutex::new(Vec::new()),
            model_credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: ProviderResponse) -> Self {
        self.generate_outcome = Ok(response);
        self
    }

    pub fn with_generate_error(mut self, error: ProviderError) -> Self {
        self.generate_outcome = Err(error);
        self
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models_outcome = Ok(models);
        self
    }

    pub fn with_models_error(mut self, error: ProviderError) -> Self {
        self.models_outcome = Err(error);
        self
    }

    /// Generation requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Credentials passed to `list_models` so far
    pub fn model_credentials(&self) -> Vec<String> {
        self.model_credentials
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeProvider for MockProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        self.generate_outcome.clone()
    }

    async fn list_models(&self, credential: &str) -> Result<Vec<ModelInfo>, ProviderError> {
        self.model_credentials
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(credential.to_string());
        self.models_outcome.clone()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Model entry for tests
pub fn model(name: &str, methods: &[&str]) -> ModelInfo {
    ModelInfo {
        name: name.to_string(),
        supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
    }
}
