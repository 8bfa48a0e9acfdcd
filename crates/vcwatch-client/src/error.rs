//! Error types for the vcwatch client

use thiserror::Error;

/// Errors that can occur when talking to the remote management API
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// API returned an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },

    /// Container view creation failed
    #[error("view creation failed: {0}")]
    ViewCreation(String),

    /// Property retrieval through a view failed
    #[error("property retrieval failed: {0}")]
    Retrieval(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
