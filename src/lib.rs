//! Zentinel Test Kit
//!
//! Test support for services that talk to other services through named HTTP
//! clients and do their work in the background.
//!
//! # Features
//!
//! - **Named-Client Mocking**: Answer requests per logical client name with a
//!   canned response or a simulated timeout
//! - **Fail Closed**: Requests from clients with no mock are rejected, never sent
//! - **Request Conditions**: Route one client's requests to different mocks by
//!   method, path, query, headers or a closure
//! - **Latency Simulation**: Add fixed or random delays
//! - **Mock Server**: Serve one client's mocks on a local port for code that
//!   only takes a base URL
//! - **Run-Until Polling**: Wait for an observable condition instead of sleeping
//! - **Test Configuration**: Swap settings files for test ones while command
//!   line and environment keep precedence
//!
//! # Example Mock File
//!
//! ```yaml
//! mocks:
//!   - client: weather
//!     request:
//!       method: [GET]
//!       path:
//!         type: prefix
//!         value: /forecast
//!     response:
//!       status: 200
//!       body:
//!         type: json
//!         content:
//!           summary: "sunny"
//!   - client: billing
//!     timeout_ms: 50
//! ```

pub mod client;
pub mod config;
pub mod configuration;
pub mod definition;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod logging;
pub mod matcher;
pub mod registry;
pub mod run_until;
pub mod server;
pub mod transport;

pub use client::{ClientFactory, ClientOptions, NamedClient};
pub use config::MockConfig;
pub use configuration::{Configuration, ConfigurationBuilder, LogLevel, TestConfigOptions};
pub use definition::{Latency, MockBehavior, MockDefinition, MockDefinitionBuilder};
pub use dispatcher::MockDispatcher;
pub use error::{
    ClientError, ConfigurationError, HostError, RunUntilError, RunUntilTimeoutError,
    TransportError, UnmockedClientError,
};
pub use host::{HostRunner, TestHost};
pub use registry::MockRegistry;
pub use run_until::{run_for, run_until, try_run_until, RunUntilOptions};
pub use server::MockServer;
pub use transport::{HttpResponse, HttpTransport, OutboundRequest, ReqwestTransport};
