use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Empty or unreadable attachment source; the attachment is dropped
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),
    /// Host cannot provide a capability (camera, voice input, ...)
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),
    /// Bytes that are not a well-formed history (bad JSON, a turn without parts)
    #[error("Invalid history: {0}")]
    InvalidHistory(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;
