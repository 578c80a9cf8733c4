//! Error Types
//!
//! Transport failures end a session and surface to the caller. Parsing
//! problems never appear here: they are logged and skipped inside the
//! streaming module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors talking to the assistant backend
#[derive(Debug, Error)]
pub enum TransportError {
    /// Backend answered with a non-success status
    #[error("Server error: {status}{}", body_suffix(.body))]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Connection or body read failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local file could not be read for upload
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was attempted
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// File is not acceptable for the upload endpoint
    #[error("Cannot upload {path}: {reason}")]
    InvalidUpload {
        /// File that was rejected
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },
}

/// Reasons a query is refused before any request is made
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Query is empty or whitespace
    #[error("Query is empty")]
    EmptyQuery,

    /// Query exceeds the configured limit
    #[error("Query is {len} bytes (max: {max})")]
    TooLong {
        /// Query length in bytes
        len: usize,
        /// Configured maximum
        max: usize,
    },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}
