use thiserror::Error;

/// Model-API-specific error types
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Model API rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for model-API operations
pub type LlmResult<T> = Result<T, LlmError>;
