//! Mock registry.
//!
//! Maps client names to the mocks registered for them, in registration
//! order. Resolution walks a client's mocks newest first and returns the
//! first one that accepts the request, so unconditional mocks follow a
//! last-write-wins policy.

use crate::config::MockConfig;
use crate::definition::{MockDefinition, MockDefinitionBuilder};
use crate::error::ConfigurationError;
use crate::transport::OutboundRequest;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-test store of mock definitions keyed by client name.
#[derive(Debug, Default)]
pub struct MockRegistry {
    mocks: RwLock<HashMap<String, Vec<Arc<MockDefinition>>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe and register one mock.
    ///
    /// ```
    /// use zentinel_testkit::MockRegistry;
    ///
    /// let registry = MockRegistry::new();
    /// registry
    ///     .mock_http_response(|mock| mock.for_named_client("weather").responds(503))
    ///     .unwrap();
    /// assert_eq!(registry.len(), 1);
    /// ```
    pub fn mock_http_response<F>(&self, configure: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(MockDefinitionBuilder) -> MockDefinitionBuilder,
    {
        let definition = configure(MockDefinition::builder()).build()?;
        self.register(definition);
        Ok(())
    }

    /// Register an already built mock.
    pub fn register(&self, definition: MockDefinition) {
        debug!(
            client = %definition.client_name(),
            conditional = definition.is_conditional(),
            "Registering http mock"
        );
        self.mocks
            .write()
            .entry(definition.client_name().to_string())
            .or_default()
            .push(Arc::new(definition));
    }

    /// Register every mock of a mock file. Nothing is registered if any entry is invalid.
    pub fn load(&self, config: &MockConfig) -> Result<usize, ConfigurationError> {
        let definitions = config.to_definitions()?;
        let count = definitions.len();
        for definition in definitions {
            self.register(definition);
        }
        Ok(count)
    }

    /// Move every mock of `other` into this registry, keeping their order.
    pub fn absorb(&self, other: MockRegistry) {
        let staged = other.mocks.into_inner();
        let mut mocks = self.mocks.write();
        for (client, definitions) in staged {
            debug!(client = %client, count = definitions.len(), "Absorbing http mocks");
            mocks.entry(client).or_default().extend(definitions);
        }
    }

    /// Find the mock answering a request, if any.
    pub fn resolve(&self, request: &OutboundRequest) -> Option<Arc<MockDefinition>> {
        let mocks = self.mocks.read();
        mocks
            .get(request.client_name())?
            .iter()
            .rev()
            .find(|mock| mock.accepts(request))
            .cloned()
    }

    /// Mocks registered for a client, oldest first.
    pub fn definitions_for(&self, client: &str) -> Vec<Arc<MockDefinition>> {
        self.mocks.read().get(client).cloned().unwrap_or_default()
    }

    /// Client names with at least one mock, sorted.
    pub fn client_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mocks.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of registered mocks.
    pub fn len(&self) -> usize {
        self.mocks.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
