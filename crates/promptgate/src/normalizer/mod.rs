//! Reply normalization
//!
//! Turns a provider outcome into either a [`ParsedReply`] or a
//! [`NormalizationError`]. Generated text may carry four literal markers
//! that delimit a reply section and a follow-up questions section:
//!
//! ```text
//! [REPLY_START] ... [REPLY_END][QUESTIONS_START] ... [QUESTIONS_END]
//! ```
//!
//! Markers are matched on their first occurrence only. Out-of-order or
//! unmatched markers are not repaired, so leftover marker text can end up
//! in the reply.

use serde::Serialize;
use thiserror::Error;

use crate::provider::{CitationSource, ProviderError, ProviderResponse, SafetyRating};

pub const REPLY_START: &str = "[REPLY_START]";
pub const REPLY_END: &str = "[REPLY_END]";
pub const QUESTIONS_START: &str = "[QUESTIONS_START]";
pub const QUESTIONS_END: &str = "[QUESTIONS_END]";

/// Message returned for quota exhaustion
pub const QUOTA_EXCEEDED_MESSAGE: &str = "Quota exceeded for this model.";

/// Lead sentence of the diagnostic for an empty provider response
pub const EMPTY_RESPONSE_MESSAGE: &str = "The AI returned an empty response. It may have been \
     blocked by content safety filters, or the usage quota may have been exceeded.";

const NEGLIGIBLE: &str = "NEGLIGIBLE";

/// Structured reply handed back to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReply {
    #[serde(rename = "reply")]
    pub reply_text: String,
    /// Cited URIs, in provider order
    pub citations: Vec<String>,
    /// Follow-up questions section, empty when absent
    pub additional_questions: String,
}

/// Machine-readable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BlockedResponse,
    QuotaExceeded,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BlockedResponse => "BLOCKED_RESPONSE",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

/// Failure to produce a reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NormalizationError {
    pub message: String,
    pub code: ErrorCode,
}

impl NormalizationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Normalize the outcome of a provider generation call
pub fn normalize(
    outcome: Result<ProviderResponse, ProviderError>,
) -> Result<ParsedReply, NormalizationError> {
    let response = match outcome {
        Ok(response) => response,
        Err(ProviderError::Quota(_)) => {
            return Err(NormalizationError::new(
                ErrorCode::QuotaExceeded,
                QUOTA_EXCEEDED_MESSAGE,
            ));
        }
        Err(ProviderError::Other(message)) => {
            return Err(NormalizationError::new(ErrorCode::Unknown, message));
        }
    };

    if response.is_empty() {
        return Err(NormalizationError::new(
            ErrorCode::BlockedResponse,
            blocked_diagnostic(&response),
        ));
    }

    let (reply_text, additional_questions) = split_sections(&response.text());

    Ok(ParsedReply {
        reply_text,
        citations: extract_citations(response.citation_sources.as_deref()),
        additional_questions,
    })
}

/// Split raw text into `(reply, additional_questions)`
pub fn split_sections(raw: &str) -> (String, String) {
    let Some((_, reply_part)) = raw.split_once(REPLY_START) else {
        return (raw.trim().to_string(), String::new());
    };

    match reply_part.split_once(QUESTIONS_START) {
        Some((reply, questions)) => (
            truncate_at(reply.trim(), REPLY_END),
            truncate_at(questions.trim(), QUESTIONS_END),
        ),
        None => (truncate_at(reply_part.trim(), REPLY_END), String::new()),
    }
}

fn truncate_at(segment: &str, marker: &str) -> String {
    segment
        .split_once(marker)
        .map_or(segment, |(head, _)| head)
        .trim()
        .to_string()
}

/// Collect non-empty citation URIs in order
pub fn extract_citations(sources: Option<&[CitationSource]>) -> Vec<String> {
    sources
        .unwrap_or_default()
        .iter()
        .filter_map(|source| source.uri.as_deref())
        .filter(|uri| !uri.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the diagnostic for a response with no content parts
pub fn blocked_diagnostic(response: &ProviderResponse) -> String {
    let mut message = EMPTY_RESPONSE_MESSAGE.to_string();
    if let Some(reason) = &response.block_reason {
        message.push_str(&format!(" (Block Reason: {reason})"));
    }

    let Some(candidate) = response.candidates.first() else {
        return message;
    };

    if let Some(reason) = &candidate.finish_reason {
        message.push_str(&format!(" (Finish Reason: {reason})"));
    }

    let ratings = format_safety_ratings(&candidate.safety_ratings);
    if !ratings.is_empty() {
        message.push_str(&format!(" (Safety Ratings: {ratings})"));
    }

    message
}

/// Join non-negligible ratings as `CATEGORY: PROBABILITY, ...`
pub fn format_safety_ratings(ratings: &[SafetyRating]) -> String {
    ratings
        .iter()
        .filter(|r| r.probability != NEGLIGIBLE)
        .map(|r| format!("{}: {}", r.category, r.probability))
        .collect::<Vec<_>>()
        .join(", ")
}
