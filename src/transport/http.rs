//! Production transport using reqwest.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

use super::{Transport, TransportError, TransportResponse};
use crate::config::TransportConfig;

/// Transport that POSTs JSON bodies over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the given timeouts and user agent.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip_all, fields(url = %url))]
    async fn send(&self, url: &Url, body: String) -> Result<TransportResponse, TransportError> {
        debug!(body_len = body.len(), "Sending request to registry");

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(
            status = status,
            response_len = body.len(),
            "Registry responded"
        );

        Ok(TransportResponse { status, body })
    }
}
