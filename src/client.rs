//! Named HTTP clients.
//!
//! A [`ClientFactory`] hands out [`NamedClient`]s that share one transport.
//! Each client stamps its logical name on the requests it sends, which is
//! what the mock dispatcher routes on.

use crate::dispatcher::MockDispatcher;
use crate::error::{ClientError, ConfigurationError};
use crate::registry::MockRegistry;
use crate::transport::{HttpResponse, HttpTransport, OutboundRequest, ReqwestTransport};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timeout applied to clients that do not configure one.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(100);

/// Per-client settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

impl ClientOptions {
    /// Options with a client-side timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigurationError> {
        if timeout.is_zero() {
            return Err(ConfigurationError::NonPositiveDuration("client timeout"));
        }
        Ok(Self { timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// An HTTP client bound to a logical name.
#[derive(Clone)]
pub struct NamedClient {
    name: Arc<str>,
    options: ClientOptions,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for NamedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedClient")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl NamedClient {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.options.timeout
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, ClientError> {
        self.execute(OutboundRequest::get(url)?).await
    }

    /// Send a request, bounded by the client's configured timeout.
    pub async fn execute(&self, request: OutboundRequest) -> Result<HttpResponse, ClientError> {
        self.execute_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Send a request that also stops when `cancel` fires.
    ///
    /// The transport races its own work against a child of `cancel`, which
    /// is canceled as well when the client timeout elapses first.
    pub async fn execute_with_cancellation(
        &self,
        request: OutboundRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, ClientError> {
        let request = request.for_client(&self.name);
        debug!(
            client = %self.name,
            method = %request.method(),
            url = %request.url(),
            "Sending request"
        );

        let token = cancel.child_token();
        let send = self.transport.send(request, token.clone());
        tokio::select! {
            result = send => result.map_err(ClientError::from),
            _ = tokio::time::sleep(self.options.timeout) => {
                token.cancel();
                warn!(
                    client = %self.name,
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    "Client timeout elapsed"
                );
                Err(ClientError::Timeout(self.options.timeout))
            }
        }
    }
}

/// Creates named clients over a shared, swappable transport.
pub struct ClientFactory {
    transport: Arc<dyn HttpTransport>,
    clients: HashMap<String, ClientOptions>,
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestTransport::default()))
    }
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("clients", &self.clients)
            .finish_non_exhaustive()
    }
}

impl ClientFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            clients: HashMap::new(),
        }
    }

    /// Register a named client with its options.
    pub fn add_client(
        &mut self,
        name: impl Into<String>,
        options: ClientOptions,
    ) -> Result<&mut Self, ConfigurationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyClientName);
        }
        self.clients.insert(name, options);
        Ok(self)
    }

    /// Replace the transport used by clients created from now on.
    pub fn use_transport(&mut self, transport: Arc<dyn HttpTransport>) {
        self.transport = transport;
    }

    /// Route every client through a mock dispatcher reading `registry`.
    pub fn use_http_mocks(&mut self, registry: Arc<MockRegistry>) -> Arc<MockDispatcher> {
        let dispatcher = Arc::new(MockDispatcher::new(registry));
        info!(clients = self.clients.len(), "Routing named clients through http mocks");
        self.use_transport(dispatcher.clone());
        dispatcher
    }

    /// Create a client. Unregistered names get default options.
    pub fn client(&self, name: &str) -> NamedClient {
        NamedClient {
            name: Arc::from(name),
            options: self.clients.get(name).copied().unwrap_or_default(),
            transport: self.transport.clone(),
        }
    }

    /// Registered client names, sorted.
    pub fn client_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }
}
