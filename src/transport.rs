//! Outbound request model and the transport seam.
//!
//! Every [`NamedClient`](crate::client::NamedClient) sends through an
//! [`HttpTransport`]. In production that is [`ReqwestTransport`]; under test
//! the [`MockDispatcher`](crate::dispatcher::MockDispatcher) is installed
//! instead.

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use tokio_util::sync::CancellationToken;

/// One outbound HTTP request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    client_name: String,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl OutboundRequest {
    /// Create a request. The client name is stamped by the client that sends it.
    pub fn new(method: Method, url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid URL `{}`: {}", url, e)))?;
        Ok(Self {
            client_name: String::new(),
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    /// Shorthand for a GET request.
    pub fn get(url: &str) -> Result<Self, TransportError> {
        Self::new(Method::GET, url)
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TransportError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("invalid header name: {}", e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid header value: {}", e)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub(crate) fn for_client(mut self, name: &str) -> Self {
        self.client_name = name.to_string();
        self
    }

    /// Logical name of the client that issued this request.
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// A response produced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Body parsed as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Something that can carry an outbound request to an answer.
///
/// Implementations must stop work and return [`TransportError::Canceled`]
/// once `cancel` fires.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: OutboundRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, TransportError>;
}

/// Real network transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: OutboundRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let OutboundRequest {
            method,
            url,
            headers,
            body,
            ..
        } = request;

        let exchange = async {
            let response = self
                .client
                .request(method, url)
                .headers(headers)
                .body(body)
                .send()
                .await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, TransportError>(HttpResponse::new(status, headers, body))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Canceled),
            result = exchange => result,
        }
    }
}
