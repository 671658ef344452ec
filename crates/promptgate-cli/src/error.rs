use promptgate::GateError;
use promptgate::provider::ProviderError;
use thiserror::Error;

/// Failures surfaced to the user by `promptgate-cli`
#[derive(Debug, Error)]
pub enum CliError {
    /// Interactive prompt answered with nothing
    #[error("No API key entered. Aborting.")]
    MissingApiKey,

    /// Config loading or HTTP client construction failed
    #[error(transparent)]
    Setup(#[from] GateError),

    #[error("Failed to list models: {0}")]
    ListModels(#[from] ProviderError),

    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    /// Reading the key from stdin or writing the prompt failed
    #[error("Terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;
