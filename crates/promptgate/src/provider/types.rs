//! Provider-neutral request and response types
//!
//! These are the shapes the rest of the crate works with. Wire formats are
//! converted into them once, inside the provider adapter.

use thiserror::Error;

/// A single generation call, built per incoming request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Prompt text sent to the model
    pub prompt: String,
    /// Model name, with or without the `models/` prefix
    pub model: String,
    /// API key used for this call only
    pub credential: String,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        model: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            credential: credential.into(),
        }
    }
}

/// Result of a successful provider round-trip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Text content parts of the first candidate (empty when blocked)
    pub parts: Vec<String>,
    /// Candidates as returned by the provider
    pub candidates: Vec<Candidate>,
    /// Citation sources, when the provider attached citation metadata
    pub citation_sources: Option<Vec<CitationSource>>,
    /// Why the prompt itself was rejected, when the provider says so
    pub block_reason: Option<String>,
}

impl ProviderResponse {
    /// Build a response carrying a single text part
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![text.into()],
            ..Self::default()
        }
    }

    /// True when the provider returned no content parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Concatenated text of all content parts
    pub fn text(&self) -> String {
        self.parts.concat()
    }
}

/// One candidate completion and its safety metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub finish_reason: Option<String>,
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
}

impl SafetyRating {
    pub fn new(category: impl Into<String>, probability: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            probability: probability.into(),
        }
    }
}

/// A URI cited as supporting evidence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationSource {
    pub uri: Option<String>,
}

/// Model metadata returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-1.5-flash`
    pub name: String,
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Whether the model can serve `generateContent` calls
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

/// Failure of a provider call, tagged by kind
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider reported resource exhaustion (quota or rate limit)
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// Any other provider-side or transport failure
    #[error("{0}")]
    Other(String),
}
