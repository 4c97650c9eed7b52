//! Rate-limited document submission.

use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{ClientConfig, DEFAULT_ENDPOINT};
use crate::document::{Document, SubmissionResult};
use crate::error::{RegistryError, Result};
use crate::ratelimit::{Admission, RateLimiter};
use crate::transport::{HttpTransport, Transport};

/// Query parameter carrying the product group.
const PRODUCT_GROUP_PARAM: &str = "pg";

/// Build the request URL for a product group.
///
/// Any query already on `base` is replaced, so the result depends only on
/// the arguments.
pub fn build_url(base: &Url, product_group: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair(PRODUCT_GROUP_PARAM, product_group);
    url
}

/// Submits signed documents to the registry through a shared rate limiter.
///
/// Share one submitter (or one `Arc<RateLimiter>`) between all tasks that
/// must count against the same limit.
pub struct DocumentSubmitter<T: Transport = HttpTransport> {
    endpoint: Url,
    limiter: Arc<RateLimiter>,
    transport: T,
}

impl DocumentSubmitter<HttpTransport> {
    /// Create a submitter talking HTTP, as described by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let limiter = RateLimiter::new(
            config.rate_limiting.request_limit,
            config.rate_limiting.window_duration(),
        )?;
        let transport = HttpTransport::new(&config.transport)?;

        Ok(Self::new(
            config.registry.endpoint()?,
            Arc::new(limiter),
            transport,
        ))
    }
}

impl<T: Transport> DocumentSubmitter<T> {
    /// Create a submitter from its parts.
    pub fn new(endpoint: Url, limiter: Arc<RateLimiter>, transport: T) -> Self {
        Self {
            endpoint,
            limiter,
            transport,
        }
    }

    /// Create a submitter for the default endpoint allowing `request_limit`
    /// submissions per `window`.
    pub fn with_rate_limit(
        window: impl Into<Duration>,
        request_limit: u32,
        transport: T,
    ) -> Result<Self> {
        let limiter = RateLimiter::new(request_limit, window)?;
        let endpoint = Url::parse(DEFAULT_ENDPOINT)
            .map_err(|e| RegistryError::Config(format!("invalid default endpoint: {}", e)))?;
        Ok(Self::new(endpoint, Arc::new(limiter), transport))
    }

    /// Get the rate limiter shared by this submitter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sign `document` and submit it, waiting for a rate limit slot first.
    ///
    /// A rejection by the registry is returned as
    /// [`SubmissionResult::Failure`]; `Err` means the call itself failed.
    /// The document is encoded before a slot is reserved, so an encoding
    /// failure costs nothing. A reserved slot is never given back.
    #[tracing::instrument(
        skip_all,
        fields(
            product_group = %product_group,
            document_format = ?document.format()
        )
    )]
    pub async fn submit(
        &self,
        document: Document,
        signature: &str,
        product_group: &str,
    ) -> Result<SubmissionResult> {
        let body = encode(document, signature)?;
        let admission = self.limiter.acquire().await;
        self.deliver(body, product_group, admission).await
    }

    /// Like [`submit`](Self::submit), but abandons the wait for a slot with
    /// [`RegistryError::Cancelled`] once `token` is cancelled.
    #[tracing::instrument(
        skip_all,
        fields(
            product_group = %product_group,
            document_format = ?document.format()
        )
    )]
    pub async fn submit_with_cancel(
        &self,
        document: Document,
        signature: &str,
        product_group: &str,
        token: &CancellationToken,
    ) -> Result<SubmissionResult> {
        let body = encode(document, signature)?;
        let admission = self.limiter.acquire_with_cancel(token).await?;
        self.deliver(body, product_group, admission).await
    }

    async fn deliver(
        &self,
        body: String,
        product_group: &str,
        admission: Admission,
    ) -> Result<SubmissionResult> {
        let url = build_url(&self.endpoint, product_group);

        debug!(
            slot = admission.slot,
            waited_ms = admission.waited.as_millis() as u64,
            "Submitting document"
        );

        let response = self.transport.send(&url, body).await?;
        let result = SubmissionResult::classify(response.status, &response.body)?;

        debug!(
            status = response.status,
            accepted = result.is_success(),
            "Submission completed"
        );

        Ok(result)
    }
}

fn encode(mut document: Document, signature: &str) -> Result<String> {
    document.sign(signature);
    document.to_json().map_err(RegistryError::Serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentFormat, Failure};
    use crate::transport::{MockTransport, TransportError};
    use futures::future::join_all;
    use tokio::time::Instant;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn test_document() -> Document {
        Document::new(DocumentFormat::Manual, "productDocument", "milk")
    }

    fn test_submitter(limit: u32, window: Duration) -> (DocumentSubmitter<MockTransport>, MockTransport) {
        init_tracing();
        let transport = MockTransport::new();
        let submitter = DocumentSubmitter::with_rate_limit(window, limit, transport.clone()).unwrap();
        (submitter, transport)
    }

    #[test]
    fn test_build_url_appends_product_group() {
        let base = Url::parse(DEFAULT_ENDPOINT).unwrap();
        let url = build_url(&base, "milk");
        assert_eq!(
            url.as_str(),
            "https://ismp.crpt.ru/api/v3/lk/documents/commissioning/contract/create?pg=milk"
        );
    }

    #[test]
    fn test_build_url_is_repeatable() {
        let base = Url::parse(DEFAULT_ENDPOINT).unwrap();
        let first = build_url(&base, "shoes");
        let second = build_url(&base, "shoes");
        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(base.as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_build_url_replaces_existing_query() {
        let base = Url::parse("https://registry.test/create?pg=old&extra=1").unwrap();
        let url = build_url(&base, "tires");
        assert_eq!(url.as_str(), "https://registry.test/create?pg=tires");
    }

    #[test]
    fn test_build_url_encodes_product_group() {
        let base = Url::parse("https://registry.test/create").unwrap();
        let url = build_url(&base, "a&b=c");
        assert_eq!(url.query(), Some("pg=a%26b%3Dc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_sends_signed_document() {
        let (submitter, transport) = test_submitter(5, Duration::from_secs(60));

        let result = submitter
            .submit(test_document(), "sampleSignature", "milk")
            .await
            .unwrap();
        assert!(result.is_success());

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url.query(), Some("pg=milk"));

        let body: serde_json::Value = serde_json::from_str(&calls[0].body).unwrap();
        assert_eq!(body["signature"], "sampleSignature");
        assert_eq!(body["document_format"], "MANUAL");
        assert_eq!(body["product_document"], "productDocument");
        assert_eq!(body["product_group"], "milk");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_is_a_result_not_an_error() {
        let (submitter, transport) = test_submitter(5, Duration::from_secs(60));
        transport.push_response(
            400,
            r#"{"code":"400","error":"bad_doc","message":"m","path":"p"}"#,
        );

        let result = submitter.submit(test_document(), "sig", "milk").await.unwrap();
        assert_eq!(
            result,
            SubmissionResult::Failure(Failure {
                code: "400".to_string(),
                error: "bad_doc".to_string(),
                message: "m".to_string(),
                path: "p".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_keeps_slot_consumed() {
        let (submitter, transport) = test_submitter(5, Duration::from_secs(60));
        transport.push_error(TransportError::Other("connection refused".to_string()));

        let err = submitter.submit(test_document(), "sig", "milk").await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));
        assert_eq!(submitter.limiter().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_response_is_deserialization_error() {
        let (submitter, transport) = test_submitter(5, Duration::from_secs(60));
        transport.push_response(200, "{}");

        let err = submitter.submit(test_document(), "sig", "milk").await.unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization { status: 200, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_submission_waits_for_window() {
        let window = Duration::from_secs(60);
        let (submitter, transport) = test_submitter(5, window);

        let started = Instant::now();
        for _ in 0..5 {
            submitter.submit(test_document(), "sig", "milk").await.unwrap();
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(submitter.limiter().count(), 5);

        let before_sixth = Instant::now();
        submitter.submit(test_document(), "sig", "milk").await.unwrap();
        let waited = before_sixth.elapsed();

        assert!(waited > Duration::ZERO);
        assert!(waited <= window);
        assert_eq!(submitter.limiter().count(), 1);
        assert_eq!(transport.call_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_submission_reaches_no_transport() {
        let (submitter, transport) = test_submitter(1, Duration::from_secs(60));
        submitter.submit(test_document(), "sig", "milk").await.unwrap();

        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                token.cancel();
            })
        };

        let err = submitter
            .submit_with_cancel(test_document(), "sig", "milk", &token)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, RegistryError::Cancelled));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(submitter.limiter().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_runs_outside_the_limiter() {
        let (submitter, transport) = test_submitter(10, Duration::from_secs(60));
        transport.set_latency(Duration::from_secs(1));
        let submitter = Arc::new(submitter);

        let started = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let submitter = submitter.clone();
                tokio::spawn(async move { submitter.submit(test_document(), "sig", "milk").await })
            })
            .collect();

        for result in join_all(handles).await {
            assert!(result.unwrap().unwrap().is_success());
        }

        assert_eq!(transport.peak_in_flight(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitters_have_independent_limits() {
        let (first, _) = test_submitter(1, Duration::from_secs(60));
        let (second, _) = test_submitter(1, Duration::from_secs(60));

        let started = Instant::now();
        first.submit(test_document(), "sig", "milk").await.unwrap();
        second.submit(test_document(), "sig", "milk").await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_limiter_counts_across_submitters() {
        init_tracing();
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60)).unwrap());
        let endpoint = Url::parse("https://registry.test/create").unwrap();
        let first = DocumentSubmitter::new(endpoint.clone(), limiter.clone(), MockTransport::new());
        let second = DocumentSubmitter::new(endpoint, limiter.clone(), MockTransport::new());

        let started = Instant::now();
        first.submit(test_document(), "sig", "milk").await.unwrap();
        second.submit(test_document(), "sig", "shoes").await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(60));
        assert_eq!(second.transport().calls()[0].url.as_str(), "https://registry.test/create?pg=shoes");
    }

    #[test]
    fn test_from_config() {
        let mut config = ClientConfig::default();
        config.registry.base_url = "https://registry.test/create".to_string();
        config.rate_limiting.request_limit = 10;

        let submitter = DocumentSubmitter::from_config(&config).unwrap();
        assert_eq!(submitter.endpoint().as_str(), "https://registry.test/create");
        assert_eq!(submitter.limiter().limit(), 10);
        assert_eq!(submitter.limiter().window(), Duration::from_secs(60));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = ClientConfig::default();
        config.rate_limiting.request_limit = 0;

        let err = DocumentSubmitter::from_config(&config).err().unwrap();
        assert!(matches!(err, RegistryError::Config(_)));
    }
}
