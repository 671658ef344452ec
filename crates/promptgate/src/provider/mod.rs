//! Generative-language provider abstraction
//!
//! The server and CLI talk to the provider only through
//! [`GenerativeProvider`], so tests can swap in a canned implementation.

mod gemini;
mod types;

pub use gemini::GeminiProvider;
pub use types::{
    Candidate, CitationSource, GenerationRequest, ModelInfo, ProviderError, ProviderResponse,
    SafetyRating,
};

use async_trait::async_trait;

/// Trait for generative-language backends
///
/// Every call carries its own credential; implementations hold no
/// per-user state.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Generate content for a single prompt
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError>;

    /// List every model visible to the credential
    async fn list_models(&self, credential: &str) -> Result<Vec<ModelInfo>, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
