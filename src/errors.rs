/*!
 * Error types for the chunkwise pipeline.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to the upstream text-generation API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The API kept answering 429 after all retries were spent
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Connect failure, timeout or any other transport-level problem
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

/// Request validation failures. The display strings are returned to callers verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid language code")]
    InvalidLanguage(String),

    #[error("Invalid or missing CEFR level")]
    InvalidLevel,

    #[error("Input text must not be empty")]
    EmptyText,
}

/// Failures of the shared (L2) cache backend. Never surfaced to callers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend could not be reached
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with an error
    #[error("Cache command failed: {0}")]
    Command(String),

    /// Stored payload could not be encoded or decoded
    #[error("Cache codec error: {0}")]
    Codec(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_io_error() || error.is_connection_dropped() || error.is_timeout() {
            Self::Unavailable(error.to_string())
        } else {
            Self::Command(error.to_string())
        }
    }
}

/// Errors that can occur while serving a translation request or running a job
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The request was rejected before any work happened
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The durable translation store failed
    #[error("Store error: {0}")]
    Store(String),

    /// The background job queue failed
    #[error("Job queue error: {0}")]
    Queue(String),
}

impl TranslationError {
    /// HTTP-equivalent status code reported to the caller
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Provider(ProviderError::RateLimitExceeded(_)) => 429,
            Self::Provider(ProviderError::ApiError { status_code, .. }) => *status_code,
            Self::Provider(ProviderError::ConnectionError(_)) => 503,
            Self::Provider(ProviderError::ParseError(_)) => 502,
            Self::Store(_) | Self::Queue(_) => 500,
        }
    }

    /// Message placed in the `error` field of a response body
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Provider(ProviderError::RateLimitExceeded(_)) => {
                "Upstream rate limit still exceeded. Please try later.".to_string()
            }
            Self::Provider(ProviderError::ConnectionError(_)) => {
                "Upstream translation service unavailable. Please try later.".to_string()
            }
            Self::Provider(e) => e.to_string(),
            Self::Store(_) | Self::Queue(_) => "Internal server error".to_string(),
        }
    }

    /// Whether a background job hitting this error is worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Provider(ProviderError::ApiError { status_code, .. }) => *status_code >= 500,
            Self::Provider(ProviderError::ParseError(_)) => false,
            Self::Provider(_) => true,
            Self::Store(_) | Self::Queue(_) => true,
        }
    }
}
