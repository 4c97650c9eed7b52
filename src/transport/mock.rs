//! Mock transport for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Transport, TransportError, TransportResponse};

/// Body returned when no response has been queued.
const DEFAULT_BODY: &str = r#"{"value":"mock-document-id","timestamp":"2024-01-01T00:00:00Z"}"#;

/// Record of a call made to the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub url: Url,
    pub body: String,
}

/// Transport returning queued responses without touching the network.
///
/// Responses are returned in FIFO order; once the queue is empty every call
/// gets a 200 with a success body. Clones share all state.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<Result<TransportResponse, TransportError>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    latency: Arc<Mutex<Duration>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body.
    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.responses.lock().push_back(Ok(TransportResponse {
            status,
            body: body.into(),
        }));
    }

    /// Queue a delivery failure.
    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Get all calls that have been made to this mock.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Get the highest number of calls that were in progress at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, url: &Url, body: String) -> Result<TransportResponse, TransportError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        self.calls.lock().push(MockCall {
            url: url.clone(),
            body,
        });

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.responses.lock().pop_front().unwrap_or_else(|| {
            Ok(TransportResponse {
                status: 200,
                body: DEFAULT_BODY.to_string(),
            })
        })
    }
}
