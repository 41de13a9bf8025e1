use thiserror::Error;

/// Content generation error types
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Chat API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Chat API rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("Generator returned no usable content")]
    EmptyResponse,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for generation
pub type GeneratorResult<T> = Result<T, GeneratorError>;
