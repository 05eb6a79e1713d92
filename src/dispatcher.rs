//! Mock dispatcher.
//!
//! Installed in place of the real transport, it answers every request issued
//! by a named client from the [`MockRegistry`]. Requests from clients with no
//! matching mock fail closed; nothing ever reaches the network.

use crate::definition::{MockBehavior, MockDefinition, MockResponse};
use crate::error::{TransportError, UnmockedClientError};
use crate::registry::MockRegistry;
use crate::transport::{HttpResponse, HttpTransport, OutboundRequest};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Method, Url};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A request seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    /// Name of the client that issued it
    pub client: String,
    pub method: Method,
    pub url: Url,
}

impl From<&OutboundRequest> for InterceptedRequest {
    fn from(request: &OutboundRequest) -> Self {
        Self {
            client: request.client_name().to_string(),
            method: request.method().clone(),
            url: request.url().clone(),
        }
    }
}

/// Transport that answers from registered mocks.
#[derive(Debug)]
pub struct MockDispatcher {
    registry: Arc<MockRegistry>,
    /// Every request received, in arrival order
    journal: RwLock<Vec<InterceptedRequest>>,
    /// Total requests processed.
    requests_total: AtomicU64,
    /// Total requests answered by a mock.
    requests_matched: AtomicU64,
    /// Total requests rejected as unmocked.
    requests_unmatched: AtomicU64,
}

impl MockDispatcher {
    /// Create a dispatcher reading from the given registry.
    pub fn new(registry: Arc<MockRegistry>) -> Self {
        info!(
            clients = registry.client_names().len(),
            mocks = registry.len(),
            "Http mock dispatcher initialized"
        );

        Self {
            registry,
            journal: RwLock::new(Vec::new()),
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<MockRegistry> {
        &self.registry
    }

    /// Get total requests processed.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests matched.
    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    /// Get total requests unmatched.
    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }

    /// All requests received so far.
    pub fn received_requests(&self) -> Vec<InterceptedRequest> {
        self.journal.read().clone()
    }

    /// Number of requests received from one client.
    pub fn request_count(&self, client: &str) -> usize {
        self.journal
            .read()
            .iter()
            .filter(|r| r.client == client)
            .count()
    }

    async fn respond(
        &self,
        mock: &MockDefinition,
        response: &MockResponse,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        if let Some(latency) = response.latency() {
            let delay = latency.sample();
            if !delay.is_zero() {
                debug!(
                    client = %mock.client_name(),
                    delay_ms = delay.as_millis() as u64,
                    "Applying delay"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TransportError::Canceled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Ok(response.to_http_response())
    }

    /// Wait for the simulated timeout or the caller's cancellation, whichever
    /// comes first, and surface the matching error.
    async fn simulate_timeout(
        &self,
        mock: &MockDefinition,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        debug!(
            client = %mock.client_name(),
            duration_ms = duration.as_millis() as u64,
            "Simulating timeout"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(client = %mock.client_name(), "Caller canceled before simulated timeout");
                Err(TransportError::Canceled)
            }
            _ = tokio::time::sleep(duration) => Err(TransportError::TimedOut(duration)),
        }
    }
}

#[async_trait]
impl HttpTransport for MockDispatcher {
    async fn send(
        &self,
        request: OutboundRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.journal.write().push(InterceptedRequest::from(&request));

        let Some(mock) = self.registry.resolve(&request) else {
            self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(
                client = %request.client_name(),
                method = %request.method(),
                url = %request.url(),
                "No http mock registered for named client"
            );
            return Err(UnmockedClientError {
                client: request.client_name().to_string(),
                method: request.method().clone(),
                url: request.url().clone(),
            }
            .into());
        };

        self.requests_matched.fetch_add(1, Ordering::Relaxed);
        debug!(
            client = %request.client_name(),
            method = %request.method(),
            path = %request.path(),
            "Request matched http mock"
        );

        match mock.behavior() {
            MockBehavior::Respond(response) => self.respond(&mock, response, &cancel).await,
            MockBehavior::TimeOut(duration) => {
                self.simulate_timeout(&mock, *duration, &cancel).await
            }
        }
    }
}
