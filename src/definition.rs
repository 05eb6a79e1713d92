//! Mock definitions and their validating builder.
//!
//! A [`MockDefinition`] binds one named client to exactly one behavior:
//! answer with a canned response, or never answer until a timeout fires.
//! Definitions are immutable once [`MockDefinitionBuilder::build`] accepts
//! them.

use crate::config::RequestMatcher;
use crate::error::ConfigurationError;
use crate::matcher::CompiledMatcher;
use crate::transport::{HttpResponse, OutboundRequest};
use bytes::Bytes;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Simulated latency applied before a mocked response is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    /// Always wait this long
    Fixed(Duration),
    /// Wait a uniformly random duration within the range (inclusive)
    Range { min: Duration, max: Duration },
}

impl Latency {
    pub fn fixed(duration: Duration) -> Self {
        Latency::Fixed(duration)
    }

    pub fn between(min: Duration, max: Duration) -> Self {
        Latency::Range { min, max }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Latency::Range { min, max } if min > max => {
                Err(ConfigurationError::InvalidLatencyRange { min, max })
            }
            _ => Ok(()),
        }
    }

    /// Pick the delay to apply for one request.
    pub fn sample(&self) -> Duration {
        match *self {
            Latency::Fixed(duration) => duration,
            Latency::Range { min, max } => {
                let min_us = min.as_micros() as u64;
                let max_us = max.as_micros() as u64;
                if max_us > min_us {
                    let mut rng = rand::thread_rng();
                    Duration::from_micros(rng.gen_range(min_us..=max_us))
                } else {
                    min
                }
            }
        }
    }
}

/// A canned response.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    latency: Option<Latency>,
}

impl MockResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn latency(&self) -> Option<Latency> {
        self.latency
    }

    pub(crate) fn to_http_response(&self) -> HttpResponse {
        HttpResponse::new(self.status, self.headers.clone(), self.body.clone())
    }
}

/// What the dispatcher does with a matched request.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Answer with a canned response
    Respond(MockResponse),
    /// Never answer; fail once the duration elapses or the caller gives up
    TimeOut(Duration),
}

type RequestPredicate = Arc<dyn Fn(&OutboundRequest) -> bool + Send + Sync>;

#[derive(Clone)]
enum Condition {
    Matcher(CompiledMatcher),
    Custom(RequestPredicate),
}

impl Condition {
    fn accepts(&self, request: &OutboundRequest) -> bool {
        match self {
            Condition::Matcher(matcher) => matcher.matches(request),
            Condition::Custom(predicate) => predicate(request),
        }
    }
}

/// An immutable mock bound to one named client.
#[derive(Clone)]
pub struct MockDefinition {
    client_name: String,
    behavior: MockBehavior,
    conditions: Vec<Condition>,
}

impl MockDefinition {
    /// Start describing a mock.
    pub fn builder() -> MockDefinitionBuilder {
        MockDefinitionBuilder::default()
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn behavior(&self) -> &MockBehavior {
        &self.behavior
    }

    /// Whether request conditions narrow this mock.
    pub fn is_conditional(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Whether this mock answers the given request.
    ///
    /// The client name is not checked here; the registry already keys on it.
    pub fn accepts(&self, request: &OutboundRequest) -> bool {
        self.conditions.iter().all(|c| c.accepts(request))
    }
}

impl fmt::Debug for MockDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDefinition")
            .field("client_name", &self.client_name)
            .field("behavior", &self.behavior)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

/// Collects the pieces of a [`MockDefinition`] and validates them on
/// [`build`](Self::build).
///
/// ```
/// use std::time::Duration;
/// use zentinel_testkit::MockDefinition;
///
/// let mock = MockDefinition::builder()
///     .for_named_client("payments")
///     .times_out(Duration::from_millis(50))
///     .build()
///     .unwrap();
/// assert_eq!(mock.client_name(), "payments");
/// ```
#[derive(Default)]
pub struct MockDefinitionBuilder {
    client_name: Option<String>,
    status: Option<u16>,
    timeout: Option<Duration>,
    behaviors_set: usize,
    body: Option<Bytes>,
    headers: Vec<(String, String)>,
    latency: Option<Latency>,
    conditions: Vec<Condition>,
    error: Option<ConfigurationError>,
}

impl MockDefinitionBuilder {
    /// Bind the mock to a named client. Must be called exactly once.
    pub fn for_named_client(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match self.client_name.clone() {
            Some(existing) => self.record(ConfigurationError::ClientNameAlreadySet {
                existing,
                requested: name,
            }),
            None => self.client_name = Some(name),
        }
        self
    }

    /// Answer with the given status, an empty body and no extra headers.
    pub fn responds(mut self, status: u16) -> Self {
        self.status = Some(status);
        self.behaviors_set += 1;
        self
    }

    /// Answer with the given status, body and headers.
    pub fn responds_with<I, K, V>(self, status: u16, body: impl Into<Bytes>, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut builder = self.responds(status).with_body(body);
        for (name, value) in headers {
            builder = builder.with_header(name, value);
        }
        builder
    }

    /// Set the response body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Delay the response.
    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Never answer; the request fails once `duration` elapses, or earlier
    /// if the caller cancels it.
    pub fn times_out(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self.behaviors_set += 1;
        self
    }

    /// Only answer requests accepted by `predicate`.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&OutboundRequest) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Condition::Custom(Arc::new(predicate)));
        self
    }

    /// Only answer requests accepted by a declarative matcher.
    pub fn matching(mut self, matcher: &RequestMatcher) -> Self {
        match CompiledMatcher::compile(matcher) {
            Ok(compiled) => self.conditions.push(Condition::Matcher(compiled)),
            Err(e) => self.record(e),
        }
        self
    }

    fn record(&mut self, error: ConfigurationError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Validate and produce the definition.
    pub fn build(self) -> Result<MockDefinition, ConfigurationError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let client_name = self
            .client_name
            .ok_or(ConfigurationError::MissingClientName)?;
        if client_name.trim().is_empty() {
            return Err(ConfigurationError::EmptyClientName);
        }

        match self.behaviors_set {
            0 => return Err(ConfigurationError::MissingBehavior(client_name)),
            1 => {}
            _ => return Err(ConfigurationError::ConflictingBehavior(client_name)),
        }

        let behavior = match (self.status, self.timeout) {
            (_, Some(timeout)) => {
                // Response shaping on a mock that never answers is contradictory.
                if self.body.is_some() || !self.headers.is_empty() || self.latency.is_some() {
                    return Err(ConfigurationError::ConflictingBehavior(client_name));
                }
                if timeout.is_zero() {
                    return Err(ConfigurationError::NonPositiveDuration("timeout"));
                }
                MockBehavior::TimeOut(timeout)
            }
            (Some(status), None) => {
                let status = StatusCode::from_u16(status)
                    .map_err(|_| ConfigurationError::InvalidStatusCode(status))?;
                if let Some(latency) = &self.latency {
                    latency.validate()?;
                }
                MockBehavior::Respond(MockResponse {
                    status,
                    headers: build_headers(&self.headers)?,
                    body: self.body.unwrap_or_default(),
                    latency: self.latency,
                })
            }
            (None, None) => return Err(ConfigurationError::MissingBehavior(client_name)),
        };

        Ok(MockDefinition {
            client_name,
            behavior,
            conditions: self.conditions,
        })
    }
}

fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, ConfigurationError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let invalid = |reason: String| ConfigurationError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathMatcher;

    #[test]
    fn test_build_respond() {
        let mock = MockDefinition::builder()
            .for_named_client("payments")
            .responds_with(201, "created", [("x-request-id", "abc")])
            .build()
            .unwrap();

        assert_eq!(mock.client_name(), "payments");
        match mock.behavior() {
            MockBehavior::Respond(response) => {
                assert_eq!(response.status(), StatusCode::CREATED);
                assert_eq!(response.body().as_ref(), b"created");
                assert_eq!(response.headers()["x-request-id"], "abc");
                assert!(response.latency().is_none());
            }
            other => panic!("Expected Respond, got {:?}", other),
        }
    }

    #[test]
    fn test_respond_defaults_to_empty() {
        let mock = MockDefinition::builder()
            .for_named_client("a")
            .responds(204)
            .build()
            .unwrap();
        let MockBehavior::Respond(response) = mock.behavior() else {
            panic!("Expected Respond");
        };
        assert!(response.body().is_empty());
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_build_timeout() {
        let mock = MockDefinition::builder()
            .for_named_client("slow")
            .times_out(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(mock.behavior(), &MockBehavior::TimeOut(Duration::from_millis(50)));
    }

    #[test]
    fn test_missing_client_name() {
        let err = MockDefinition::builder().responds(200).build().unwrap_err();
        assert_eq!(err, ConfigurationError::MissingClientName);
    }

    #[test]
    fn test_empty_client_name() {
        let err = MockDefinition::builder()
            .for_named_client("")
            .responds(200)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyClientName);
    }

    #[test]
    fn test_client_name_set_twice() {
        let err = MockDefinition::builder()
            .for_named_client("a")
            .for_named_client("b")
            .responds(200)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ClientNameAlreadySet { .. }));
    }

    #[test]
    fn test_missing_behavior() {
        let err = MockDefinition::builder()
            .for_named_client("a")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::MissingBehavior("a".to_string()));
    }

    #[test]
    fn test_both_behaviors_rejected() {
        let err = MockDefinition::builder()
            .for_named_client("a")
            .responds(200)
            .times_out(Duration::from_secs(1))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::ConflictingBehavior("a".to_string()));
    }

    #[test]
    fn test_response_shaping_on_timeout_rejected() {
        let err = MockDefinition::builder()
            .for_named_client("a")
            .times_out(Duration::from_secs(1))
            .with_body("never sent")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::ConflictingBehavior("a".to_string()));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = MockDefinition::builder()
            .for_named_client("a")
            .times_out(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::NonPositiveDuration("timeout"));
    }

    #[test]
    fn test_invalid_status_and_header() {
        let err = MockDefinition::builder()
            .for_named_client("a")
            .responds(42)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidStatusCode(42));

        let err = MockDefinition::builder()
            .for_named_client("a")
            .responds(200)
            .with_header("bad header", "v")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidHeader { .. }));
    }

    #[test]
    fn test_latency() {
        let fixed = Latency::fixed(Duration::from_millis(100));
        assert_eq!(fixed.sample(), Duration::from_millis(100));

        let range = Latency::between(Duration::from_millis(50), Duration::from_millis(150));
        let delay = range.sample();
        assert!(delay >= Duration::from_millis(50) && delay <= Duration::from_millis(150));

        let err = MockDefinition::builder()
            .for_named_client("a")
            .responds(200)
            .with_latency(Latency::between(Duration::from_secs(2), Duration::from_secs(1)))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidLatencyRange { .. }));
    }

    #[test]
    fn test_conditions() {
        let matcher = RequestMatcher {
            method: vec!["GET".to_string()],
            path: Some(PathMatcher::Prefix {
                value: "/v1/".to_string(),
            }),
            ..Default::default()
        };
        let mock = MockDefinition::builder()
            .for_named_client("api")
            .responds(200)
            .matching(&matcher)
            .when(|req| req.url().query().is_none())
            .build()
            .unwrap();
        assert!(mock.is_conditional());

        let ok = OutboundRequest::get("http://api.test/v1/users").unwrap();
        let with_query = OutboundRequest::get("http://api.test/v1/users?page=1").unwrap();
        let other_path = OutboundRequest::get("http://api.test/v2/users").unwrap();
        assert!(mock.accepts(&ok));
        assert!(!mock.accepts(&with_query));
        assert!(!mock.accepts(&other_path));
    }

    #[test]
    fn test_invalid_matcher_reported_at_build() {
        let matcher = RequestMatcher {
            path: Some(PathMatcher::Regex {
                pattern: "(".to_string(),
            }),
            ..Default::default()
        };
        let err = MockDefinition::builder()
            .for_named_client("api")
            .responds(200)
            .matching(&matcher)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPattern { kind: "regex", .. }));
    }
}
