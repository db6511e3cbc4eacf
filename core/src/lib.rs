// Core Gemini API functionality for the chat session:
// - Turn / Part / Attachment data model shared by history and the wire
// - Reply client for the generateContent endpoint
// - Configuration loading
// - Shared error types

// Export client module - API client for Gemini
pub mod client;
pub use self::client::*;

// Export types module - Request/response data structures
pub mod types;
pub use self::types::*;

// Export config module - Configuration loading
pub mod config;
pub use self::config::*;

// Export errors module - Shared error types
pub mod errors;
pub use self::errors::*;
