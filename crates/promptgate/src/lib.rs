//! Promptgate - a small HTTP relay for the Gemini API
//!
//! Accepts a prompt and model name, forwards them to the provider, and
//! returns a normalized `{reply, citations, additionalQuestions}` payload.

pub mod config;
pub mod error;
pub mod gateway;
pub mod normalizer;
pub mod provider;
pub mod testing;

pub use error::GateError;
