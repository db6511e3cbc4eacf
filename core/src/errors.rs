use thiserror::Error;

/// Gemini configuration and local I/O errors
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Result type for Gemini operations
pub type GeminiResult<T> = Result<T, GeminiError>;

/// Failure of a single reply request.
///
/// None of these are fatal to a session; they are shown inline in place of
/// the reply and the session keeps accepting input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// The transport could not complete the call (connect, timeout, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("{0}")]
    Remote(String),

    /// Success status, but no reply text where it was expected.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

pub type ReplyResult<T> = Result<T, ReplyError>;
