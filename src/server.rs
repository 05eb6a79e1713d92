//! Out-of-process http mocks.
//!
//! [`MockServer`] serves the mocks of one named client over a real local
//! listener, for applications that cannot have a transport injected and
//! only accept a base URL. Requests are answered by the same
//! [`MockDispatcher`] used in-process, so matching, latency and simulated
//! timeouts behave identically. Dispatch failures become HTTP statuses:
//!
//! | Failure | Status |
//! |---|---|
//! | no matching mock | 501 Not Implemented |
//! | simulated timeout elapsed | 504 Gateway Timeout |
//! | server shutting down | 503 Service Unavailable |
//! | malformed request | 400 Bad Request |

use crate::dispatcher::MockDispatcher;
use crate::error::TransportError;
use crate::registry::MockRegistry;
use crate::transport::{HttpResponse, HttpTransport, OutboundRequest};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A local HTTP server answering from the mocks of one named client.
///
/// The server stops when [`shutdown`](Self::shutdown) is awaited or the
/// value is dropped.
#[derive(Debug)]
pub struct MockServer {
    client: Arc<str>,
    address: SocketAddr,
    dispatcher: Arc<MockDispatcher>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Bind to a random port on 127.0.0.1 and serve `client`'s mocks.
    pub async fn start(client: &str, registry: Arc<MockRegistry>) -> io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let address = listener.local_addr()?;
        let client: Arc<str> = Arc::from(client);
        let dispatcher = Arc::new(MockDispatcher::new(registry));
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(accept_loop(
            listener,
            address,
            client.clone(),
            dispatcher.clone(),
            shutdown.clone(),
        ));

        info!(client = %client, address = %address, "Http mock server listening");
        Ok(Self {
            client,
            address,
            dispatcher,
            shutdown,
            task: Some(task),
        })
    }

    pub fn client_name(&self) -> &str {
        &self.client
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Base URL to configure the application under test with.
    pub fn uri(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.uri(), path.trim_start_matches('/'))
    }

    /// Dispatcher answering the requests, for request assertions.
    pub fn dispatcher(&self) -> &Arc<MockDispatcher> {
        &self.dispatcher
    }

    /// Stop accepting connections and wait for the listener to close.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Http mock server task failed");
            }
        }
        debug!(client = %self.client, "Http mock server stopped");
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    address: SocketAddr,
    client: Arc<str>,
    dispatcher: Arc<MockDispatcher>,
    shutdown: CancellationToken,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(error = %e, "Failed to accept http mock connection");
                    continue;
                }
            },
        };

        let client = client.clone();
        let dispatcher = dispatcher.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let client = client.clone();
                let dispatcher = dispatcher.clone();
                let cancel = shutdown.child_token();
                async move {
                    let response = handle(&client, address, &dispatcher, cancel, request).await;
                    Ok::<_, Infallible>(response)
                }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(peer = %peer, error = %e, "Http mock connection closed");
            }
        });
    }
}

async fn handle(
    client: &str,
    address: SocketAddr,
    dispatcher: &MockDispatcher,
    cancel: CancellationToken,
    request: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let outcome = match to_outbound(client, address, request).await {
        Ok(outbound) => dispatcher.send(outbound, cancel).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(response) => to_hyper_response(response),
        Err(e) => error_response(&e),
    }
}

async fn to_outbound(
    client: &str,
    address: SocketAddr,
    request: Request<Incoming>,
) -> Result<OutboundRequest, TransportError> {
    let (parts, body) = request.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| TransportError::InvalidRequest(format!("failed to read body: {}", e)))?
        .to_bytes();

    let path = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let url = format!("http://{}{}", address, path);

    Ok(OutboundRequest::new(parts.method, &url)?
        .with_headers(parts.headers)
        .with_body(body)
        .for_client(client))
}

fn to_hyper_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let (status, headers, body) = response.into_parts();
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn error_response(error: &TransportError) -> Response<Full<Bytes>> {
    let status = match error {
        TransportError::Unmocked(_) => StatusCode::NOT_IMPLEMENTED,
        TransportError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        TransportError::Canceled => StatusCode::SERVICE_UNAVAILABLE,
        TransportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        TransportError::Http(_) => StatusCode::BAD_GATEWAY,
    };
    let mut response = Response::new(Full::new(Bytes::from(error.to_string())));
    *response.status_mut() = status;
    response
}
