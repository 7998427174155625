//! Error types for Sidekick
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Sidekick operations
///
/// The user-facing variants (`HttpStatus`, `Timeout`, `Proxy`,
/// `MissingContent`) render exactly the text the sidebar shows.
#[derive(Error, Debug)]
pub enum SidekickError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted settings store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A browser host call was rejected (tab lookup, script injection, messaging)
    #[error("Browser error: {0}")]
    Browser(String),

    /// Page content could not be loaded or is empty
    #[error("{0}")]
    MissingContent(String),

    /// The proxy request exceeded the dispatcher timeout
    #[error("Request timed out after {seconds} seconds. The Ollama server might be busy or the model might be too large for the current request.")]
    Timeout {
        /// Timeout that elapsed, in whole seconds
        seconds: u64,
    },

    /// The proxy answered with a non-success status code
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// The proxy answered with an `error` field
    #[error("{message}")]
    Proxy {
        /// Message reported by the proxy or model server
        message: String,
    },

    /// The proxy could not be reached
    #[error("Failed to communicate with proxy server: {0}")]
    Network(String),

    /// Content extraction failed inside the page
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SidekickError {
    /// Returns true when this error is the dispatcher timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, SidekickError::Timeout { .. })
    }
}

/// Result type alias for Sidekick operations
///
/// Uses `anyhow::Error` so call sites can attach context; callers that need
/// to branch on the failure kind use `downcast_ref::<SidekickError>()`.
pub type Result<T> = anyhow::Result<T>;
