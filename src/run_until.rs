//! Run-until executor.
//!
//! Polls a predicate until it holds or a timeout elapses, instead of
//! sleeping a fixed amount and hoping background work has finished. The wait
//! between polls is a tokio timer, so other tasks (the host's background
//! work included) keep running while the test waits.

use crate::error::{ConfigurationError, RunUntilError, RunUntilTimeoutError};
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default wait between two predicate checks.
pub const DEFAULT_PREDICATE_CHECK_INTERVAL: Duration = Duration::from_millis(5);

/// Default time allowed for the predicate to become true.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Polling cadence and deadline of a run-until call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunUntilOptions {
    predicate_check_interval: Duration,
    timeout: Duration,
}

impl Default for RunUntilOptions {
    fn default() -> Self {
        Self {
            predicate_check_interval: DEFAULT_PREDICATE_CHECK_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RunUntilOptions {
    /// Options with both values set. Zero durations are rejected.
    pub fn new(
        predicate_check_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        if predicate_check_interval.is_zero() {
            return Err(ConfigurationError::NonPositiveDuration(
                "predicate check interval",
            ));
        }
        if timeout.is_zero() {
            return Err(ConfigurationError::NonPositiveDuration("run-until timeout"));
        }
        Ok(Self {
            predicate_check_interval,
            timeout,
        })
    }

    /// Copy of these options with another timeout.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, ConfigurationError> {
        Self::new(self.predicate_check_interval, timeout)
    }

    /// Copy of these options with another check interval.
    pub fn with_predicate_check_interval(
        self,
        interval: Duration,
    ) -> Result<Self, ConfigurationError> {
        Self::new(interval, self.timeout)
    }

    pub fn predicate_check_interval(&self) -> Duration {
        self.predicate_check_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// State of one run-until call.
#[derive(Debug)]
struct PollState {
    started: Instant,
    deadline: Instant,
    last_result: bool,
    polls: u32,
}

impl PollState {
    fn start(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + timeout,
            last_result: false,
            polls: 0,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Poll `predicate` until it returns `true`.
///
/// The first check happens immediately. Fails with
/// [`RunUntilTimeoutError`] once the configured timeout has elapsed, never
/// earlier.
pub async fn run_until<F>(
    mut predicate: F,
    options: &RunUntilOptions,
) -> Result<(), RunUntilTimeoutError>
where
    F: FnMut() -> bool,
{
    try_run_until(|| Ok::<_, Infallible>(predicate()), options)
        .await
        .map_err(|e| match e {
            RunUntilError::Timeout(timeout) => timeout,
            RunUntilError::Predicate(never) => match never {},
        })
}

/// Poll a fallible predicate until it returns `Ok(true)`.
///
/// An `Err` from the predicate stops polling at once and is returned as
/// [`RunUntilError::Predicate`].
pub async fn try_run_until<F, E>(
    mut predicate: F,
    options: &RunUntilOptions,
) -> Result<(), RunUntilError<E>>
where
    F: FnMut() -> Result<bool, E>,
{
    let mut state = PollState::start(options.timeout());

    loop {
        state.last_result = predicate().map_err(RunUntilError::Predicate)?;
        state.polls += 1;

        if state.last_result {
            debug!(
                polls = state.polls,
                elapsed_ms = state.elapsed().as_millis() as u64,
                "Run-until condition satisfied"
            );
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(options.predicate_check_interval()) => {}
            _ = tokio::time::sleep_until(state.deadline) => {}
        }

        if state.is_expired() {
            let elapsed = state.elapsed();
            warn!(
                polls = state.polls,
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = options.timeout().as_millis() as u64,
                "Run-until condition not met before timeout"
            );
            return Err(RunUntilTimeoutError {
                elapsed,
                timeout: options.timeout(),
            }
            .into());
        }
    }
}

/// Let background work run for `duration`, then succeed.
pub async fn run_for(duration: Duration) -> Result<(), ConfigurationError> {
    let options = RunUntilOptions::default().with_timeout(duration)?;
    debug!(
        duration_ms = duration.as_millis() as u64,
        "Running for fixed duration"
    );
    // The predicate never holds, so the timeout is the expected outcome.
    let _ = run_until(|| false, &options).await;
    Ok(())
}
