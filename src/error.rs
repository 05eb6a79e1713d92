//! Error types for the test kit.
//!
//! Configuration problems are reported eagerly, when mocks, options or test
//! settings are registered. Dispatch and polling failures are reported per
//! call and never retried.

use reqwest::{Method, Url};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Invalid or incomplete setup input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The named client of a mock was empty.
    #[error("client name cannot be empty")]
    EmptyClientName,

    /// `for_named_client` was called more than once on the same mock.
    #[error("mock is already bound to client `{existing}`, cannot rebind it to `{requested}`")]
    ClientNameAlreadySet { existing: String, requested: String },

    /// `for_named_client` was never called.
    #[error("mock is not bound to a named client")]
    MissingClientName,

    /// Neither `responds` nor `times_out` was called.
    #[error("mock for client `{0}` has no behavior, call `responds` or `times_out`")]
    MissingBehavior(String),

    /// More than one behavior was configured on the same mock.
    #[error("mock for client `{0}` configures more than one behavior")]
    ConflictingBehavior(String),

    /// A duration that must be positive was zero.
    #[error("{0} must be a positive duration")]
    NonPositiveDuration(&'static str),

    /// A latency range with its bounds the wrong way round.
    #[error("latency range is inverted: min {min:?} > max {max:?}")]
    InvalidLatencyRange { min: Duration, max: Duration },

    /// Status code outside of what the HTTP stack accepts.
    #[error("invalid HTTP status code: {0}")]
    InvalidStatusCode(u16),

    /// Header name or value rejected by the HTTP stack.
    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Regex or glob pattern that failed to compile.
    #[error("invalid {kind} pattern `{pattern}`: {reason}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        reason: String,
    },

    /// Mock body that cannot be decoded.
    #[error("invalid mock body: {0}")]
    InvalidBody(String),

    /// One entry of a mock file is invalid.
    #[error("mock {index}: {source}")]
    InvalidMock {
        index: usize,
        source: Box<ConfigurationError>,
    },

    /// A required argument was empty or only white space.
    #[error("{0} cannot be empty or white space")]
    BlankArgument(&'static str),

    /// A required argument was empty.
    #[error("{0} cannot be empty")]
    EmptyArgument(&'static str),

    /// A required configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// A file exists but could not be read.
    #[error("failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    /// A file was read but its content is malformed.
    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// Mocks were registered after the host started serving.
    #[error("http mocks must be registered before the test host starts")]
    HostAlreadyStarted,
}

/// A named client issued a request no mock was registered for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no mock registered for named client `{client}` ({method} {url})")]
pub struct UnmockedClientError {
    /// Name of the client that issued the request
    pub client: String,
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
}

/// A run-until predicate did not become true in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("condition was not met within the configured timeout of {timeout:?} (elapsed {elapsed:?})")]
pub struct RunUntilTimeoutError {
    /// Time spent polling
    pub elapsed: Duration,
    /// Configured timeout
    pub timeout: Duration,
}

/// Failure of a run-until call driven by a fallible predicate.
#[derive(Debug, Error)]
pub enum RunUntilError<E> {
    /// The predicate never returned `true`.
    #[error(transparent)]
    Timeout(#[from] RunUntilTimeoutError),

    /// The predicate itself failed; polling was abandoned.
    #[error("run-until predicate failed: {0}")]
    Predicate(E),
}

/// Failure raised by an [`HttpTransport`](crate::transport::HttpTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Fail-closed rejection of a request with no matching mock.
    #[error(transparent)]
    Unmocked(#[from] UnmockedClientError),

    /// The transport gave up waiting for an answer.
    #[error("Timeout triggered after {0:?}.")]
    TimedOut(Duration),

    /// The caller canceled the request before the transport finished.
    #[error("The request was canceled.")]
    Canceled,

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Real network failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure observed by the caller of a [`NamedClient`](crate::client::NamedClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client's own configured timeout elapsed first.
    #[error("The request was canceled due to the configured client timeout of {0:?} elapsing.")]
    Timeout(Duration),

    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Whether the failure is a fail-closed rejection of an unmocked client.
    pub fn is_unmocked(&self) -> bool {
        matches!(self, ClientError::Transport(TransportError::Unmocked(_)))
    }
}

/// Failure of a [`HostRunner`](crate::host::HostRunner) operation.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host failed to start.
    #[error("failed to start test host: {0:#}")]
    Start(anyhow::Error),

    /// The host failed to stop.
    #[error("failed to stop test host: {0:#}")]
    Stop(anyhow::Error),

    /// Polling timed out.
    #[error(transparent)]
    RunUntil(#[from] RunUntilTimeoutError),

    /// Invalid options or mock setup.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
