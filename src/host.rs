//! Test host runner.
//!
//! A [`TestHost`] is the application under test: something that can be
//! started, stopped, and told which transport its named clients must use.
//! [`HostRunner`] wires http mocks into it, starts it, waits for an
//! observable condition and stops it again.

use crate::dispatcher::MockDispatcher;
use crate::error::{ConfigurationError, HostError};
use crate::registry::MockRegistry;
use crate::run_until::{run_until, RunUntilOptions};
use crate::transport::HttpTransport;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Application hosted for the duration of a test.
#[async_trait]
pub trait TestHost: Send {
    /// Start serving and spawn background work.
    async fn start(&mut self) -> anyhow::Result<()>;

    /// Stop background work and release resources.
    async fn stop(&mut self) -> anyhow::Result<()>;

    /// Route every named client of the host through `transport`.
    fn install_transport(&mut self, transport: Arc<dyn HttpTransport>);
}

/// Drives a [`TestHost`] through one test.
#[derive(Debug)]
pub struct HostRunner<H> {
    host: H,
    started: bool,
    dispatcher: Option<Arc<MockDispatcher>>,
}

impl<H: TestHost> HostRunner<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            started: false,
            dispatcher: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_inner(self) -> H {
        self.host
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Dispatcher installed by [`use_http_mocks`](Self::use_http_mocks), if any.
    pub fn dispatcher(&self) -> Option<&Arc<MockDispatcher>> {
        self.dispatcher.as_ref()
    }

    /// Register http mocks and route the host's named clients to them.
    ///
    /// Calls are additive: later calls register into the same registry and
    /// return the dispatcher installed by the first one. Mocks are staged
    /// and only kept when `configure` succeeds. Fails once the host has
    /// started.
    pub fn use_http_mocks<F>(
        &mut self,
        configure: F,
    ) -> Result<Arc<MockDispatcher>, ConfigurationError>
    where
        F: FnOnce(&MockRegistry) -> Result<(), ConfigurationError>,
    {
        if self.started {
            return Err(ConfigurationError::HostAlreadyStarted);
        }

        let staged = MockRegistry::new();
        configure(&staged)?;

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.registry().absorb(staged);
            return Ok(dispatcher.clone());
        }

        let dispatcher = Arc::new(MockDispatcher::new(Arc::new(staged)));
        self.host.install_transport(dispatcher.clone());
        self.dispatcher = Some(dispatcher.clone());
        Ok(dispatcher)
    }

    /// Start the host unless it is already running.
    pub async fn start(&mut self) -> Result<(), HostError> {
        if self.started {
            return Ok(());
        }
        self.host.start().await.map_err(HostError::Start)?;
        self.started = true;
        info!("Test host started");
        Ok(())
    }

    /// Stop the host if it is running.
    pub async fn stop(&mut self) -> Result<(), HostError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.host.stop().await.map_err(HostError::Stop)?;
        info!("Test host stopped");
        Ok(())
    }

    /// Start the host, wait for `predicate`, then stop the host.
    ///
    /// The host is stopped whether or not the predicate was satisfied. A
    /// polling timeout takes precedence over a failure to stop.
    pub async fn run_until<F>(
        &mut self,
        predicate: F,
        options: &RunUntilOptions,
    ) -> Result<(), HostError>
    where
        F: FnMut() -> bool,
    {
        self.start().await?;
        let outcome = run_until(predicate, options).await;
        let stopped = self.stop().await;

        match (outcome, stopped) {
            (Err(timeout), Err(stop)) => {
                warn!(error = %stop, "Test host failed to stop after run-until timeout");
                Err(timeout.into())
            }
            (Err(timeout), Ok(())) => Err(timeout.into()),
            (Ok(()), stopped) => stopped,
        }
    }

    /// Start the host, let it run for `duration`, then stop it.
    pub async fn run_until_timeout(&mut self, duration: Duration) -> Result<(), HostError> {
        let options = RunUntilOptions::default().with_timeout(duration)?;
        debug!(
            duration_ms = duration.as_millis() as u64,
            "Running test host for fixed duration"
        );
        match self.run_until(|| false, &options).await {
            Ok(()) | Err(HostError::RunUntil(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
