//! Error types for registry submissions.

use thiserror::Error;

use crate::transport::TransportError;

/// Main error type for submitter operations.
///
/// A document rejected by the registry is not an error: it comes back as
/// [`SubmissionResult::Failure`](crate::document::SubmissionResult::Failure).
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Waiting for a rate limit slot was cancelled
    #[error("Submission cancelled while waiting for a rate limit slot")]
    Cancelled,

    /// The document could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The request could not be delivered
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response body matched neither known result shape
    #[error("Unrecognized response (HTTP {status}): {reason}")]
    Deserialization { status: u16, reason: String },
}

/// Result type alias for submitter operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
