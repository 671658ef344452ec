//! Error types for Promptgate

use thiserror::Error;

/// Main error type for Promptgate startup and server operations
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// Provider client construction errors
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Result type alias for Promptgate operations
pub type Result<T> = std::result::Result<T, GateError>;
