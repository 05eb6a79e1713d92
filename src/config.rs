//! Declarative mock files.
//!
//! Mocks can be declared in YAML instead of built in code. Every entry is
//! validated through the same builder as programmatic mocks.

use crate::definition::{Latency, MockDefinition};
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A file of mock definitions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    /// Mocks in registration order (later entries win for the same client)
    #[serde(default)]
    pub mocks: Vec<MockSpec>,
}

impl MockConfig {
    /// Load mocks from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.is_file() {
            return Err(ConfigurationError::MissingFile(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Parse mocks from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        Self::parse(yaml, Path::new("<inline>"))
    }

    fn parse(yaml: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigurationError::Parse {
            path: PathBuf::from(origin),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every mock.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.to_definitions().map(|_| ())
    }

    /// Build every mock, failing on the first invalid entry.
    pub fn to_definitions(&self) -> Result<Vec<MockDefinition>, ConfigurationError> {
        self.mocks
            .iter()
            .enumerate()
            .map(|(index, mock)| {
                mock.to_definition()
                    .map_err(|e| ConfigurationError::InvalidMock {
                        index,
                        source: Box::new(e),
                    })
            })
            .collect()
    }
}

/// A single mock entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockSpec {
    /// Named client this mock is bound to
    pub client: String,

    /// Optional description
    #[serde(default)]
    pub name: Option<String>,

    /// Request conditions
    #[serde(default)]
    pub request: Option<RequestMatcher>,

    /// Response to return
    #[serde(default)]
    pub response: Option<ResponseDefinition>,

    /// Latency simulation for the response
    #[serde(default)]
    pub delay: Option<DelayConfig>,

    /// Never answer; time out after this many milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl MockSpec {
    /// Build the definition this entry describes.
    pub fn to_definition(&self) -> Result<MockDefinition, ConfigurationError> {
        let mut builder = MockDefinition::builder().for_named_client(self.client.clone());

        if let Some(request) = &self.request {
            builder = builder.matching(request);
        }

        if let Some(response) = &self.response {
            builder = builder.responds(response.status);
            let has_content_type = response
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case("content-type"));
            if let Some(body) = &response.body {
                builder = builder.with_body(body.to_bytes()?);
                if !has_content_type {
                    builder = builder.with_header("Content-Type", body.content_type());
                }
            }
            for (name, value) in &response.headers {
                builder = builder.with_header(name.clone(), value.clone());
            }
        }

        if let Some(delay) = &self.delay {
            builder = builder.with_latency(delay.to_latency());
        }

        if let Some(timeout_ms) = self.timeout_ms {
            builder = builder.times_out(Duration::from_millis(timeout_ms));
        }

        builder.build()
    }
}

/// Request matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RequestMatcher {
    /// HTTP method(s) to match (empty = any)
    #[serde(default)]
    pub method: Vec<String>,

    /// Path matching
    #[serde(default)]
    pub path: Option<PathMatcher>,

    /// Query parameter matching
    #[serde(default)]
    pub query: HashMap<String, QueryMatcher>,

    /// Header matching
    #[serde(default)]
    pub headers: HashMap<String, HeaderMatcher>,
}

/// Path matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathMatcher {
    /// Exact path match
    Exact { value: String },
    /// Path prefix match
    Prefix { value: String },
    /// Regex pattern match
    Regex { pattern: String },
    /// Glob pattern match
    Glob { pattern: String },
}

/// Query parameter matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryMatcher {
    Exact { value: String },
    Regex { pattern: String },
    Present,
    Absent,
}

/// Header matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeaderMatcher {
    Exact { value: String },
    Regex { pattern: String },
    Present,
    Absent,
    /// Value must contain substring
    Contains { value: String },
}

/// Response definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseDefinition {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body
    #[serde(default)]
    pub body: Option<ResponseBody>,
}

fn default_status() -> u16 {
    200
}

/// Response body configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Plain text body
    Text { content: String },
    /// JSON body
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
}

impl ResponseBody {
    /// Get the body content as bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigurationError> {
        match self {
            ResponseBody::Text { content } => Ok(content.as_bytes().to_vec()),
            ResponseBody::Json { content } => serde_json::to_vec(content)
                .map_err(|e| ConfigurationError::InvalidBody(e.to_string())),
            ResponseBody::Base64 { content } => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(content)
                    .map_err(|e| ConfigurationError::InvalidBody(format!("invalid base64: {}", e)))
            }
        }
    }

    /// Get content type for this body.
    pub fn content_type(&self) -> &'static str {
        match self {
            ResponseBody::Text { .. } => "text/plain",
            ResponseBody::Json { .. } => "application/json",
            ResponseBody::Base64 { .. } => "application/octet-stream",
        }
    }
}

/// Delay/latency simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    /// Fixed delay in milliseconds
    #[serde(default)]
    pub fixed_ms: u64,

    /// Minimum delay for random range (ms)
    #[serde(default)]
    pub min_ms: u64,

    /// Maximum delay for random range (ms)
    #[serde(default)]
    pub max_ms: u64,
}

impl DelayConfig {
    pub fn to_latency(&self) -> Latency {
        if self.fixed_ms > 0 {
            return Latency::fixed(Duration::from_millis(self.fixed_ms));
        }
        Latency::between(
            Duration::from_millis(self.min_ms),
            Duration::from_millis(self.max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::MockBehavior;
    use std::io::Write;

    #[test]
    fn test_parse_simple_mock() {
        let yaml = r#"
mocks:
  - client: greeter
    request:
      method: [GET]
      path:
        type: exact
        value: /hello
    response:
      status: 200
      body:
        type: text
        content: "Hello, World!"
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.mocks.len(), 1);

        let definitions = config.to_definitions().unwrap();
        assert_eq!(definitions[0].client_name(), "greeter");
        assert!(definitions[0].is_conditional());
        match definitions[0].behavior() {
            MockBehavior::Respond(response) => {
                assert_eq!(response.body().as_ref(), b"Hello, World!");
                assert_eq!(response.headers()["content-type"], "text/plain");
            }
            other => panic!("Expected Respond, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_response_keeps_explicit_content_type() {
        let yaml = r#"
mocks:
  - client: api
    response:
      status: 201
      headers:
        Content-Type: application/vnd.api+json
      body:
        type: json
        content:
          message: "success"
          code: 0
"#;
        let definitions = MockConfig::from_yaml(yaml).unwrap().to_definitions().unwrap();
        let MockBehavior::Respond(response) = definitions[0].behavior() else {
            panic!("Expected Respond");
        };
        assert_eq!(response.status().as_u16(), 201);
        assert_eq!(response.headers().get_all("content-type").iter().count(), 1);
        assert_eq!(response.headers()["content-type"], "application/vnd.api+json");
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["message"], "success");
    }

    #[test]
    fn test_parse_timeout_and_delay() {
        let yaml = r#"
mocks:
  - client: slow
    timeout_ms: 50
  - client: laggy
    response:
      status: 200
    delay:
      min_ms: 10
      max_ms: 20
"#;
        let definitions = MockConfig::from_yaml(yaml).unwrap().to_definitions().unwrap();
        assert_eq!(
            definitions[0].behavior(),
            &MockBehavior::TimeOut(Duration::from_millis(50))
        );
        let MockBehavior::Respond(response) = definitions[1].behavior() else {
            panic!("Expected Respond");
        };
        assert_eq!(
            response.latency(),
            Some(Latency::between(
                Duration::from_millis(10),
                Duration::from_millis(20)
            ))
        );
    }

    #[test]
    fn test_invalid_mock_reports_index() {
        let yaml = r#"
mocks:
  - client: ok
    response:
      status: 200
  - client: broken
"#;
        let err = MockConfig::from_yaml(yaml).unwrap_err();
        match err {
            ConfigurationError::InvalidMock { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(*source, ConfigurationError::MissingBehavior("broken".to_string()));
            }
            other => panic!("Expected InvalidMock, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = MockConfig::from_yaml("mocks:\n  - client: a\n    bogus: 1\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mocks:\n  - client: a\n    response:\n      status: 503").unwrap();
        let config = MockConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mocks[0].client, "a");

        let missing = MockConfig::from_file(Path::new("/nonexistent/mocks.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigurationError::MissingFile(_)));
    }

    #[test]
    fn test_response_body_to_bytes() {
        let text = ResponseBody::Text {
            content: "hello".to_string(),
        };
        assert_eq!(text.to_bytes().unwrap(), b"hello");

        let binary = ResponseBody::Base64 {
            content: "aGVsbG8=".to_string(),
        };
        assert_eq!(binary.to_bytes().unwrap(), b"hello");

        let bad = ResponseBody::Base64 {
            content: "***".to_string(),
        };
        assert!(matches!(bad.to_bytes(), Err(ConfigurationError::InvalidBody(_))));
    }
}
