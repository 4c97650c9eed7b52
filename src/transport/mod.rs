//! Delivery of request bodies to the registry.
//!
//! The [`Transport`] trait keeps the submitter independent of the HTTP stack,
//! so tests can replace the network with [`MockTransport`].

mod http;
#[cfg(any(test, feature = "test-helpers"))]
mod mock;

use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use thiserror::Error;

pub use http::HttpTransport;
#[cfg(any(test, feature = "test-helpers"))]
pub use mock::{MockCall, MockTransport};

/// Raw response returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

/// Failure to exchange a request with the registry.
///
/// Any response that arrives, whatever its status, is not a transport error.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other delivery failure
    #[error("{0}")]
    Other(String),
}

/// Sends a JSON body to a URL and returns the raw response.
///
/// Implementations must be safe to share between tasks; the submitter calls
/// `send` outside of any rate limiter lock.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url`.
    async fn send(&self, url: &Url, body: String) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, url: &Url, body: String) -> Result<TransportResponse, TransportError> {
        (**self).send(url, body).await
    }
}
