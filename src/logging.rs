//! Tracing setup for tests.

use crate::configuration::{Configuration, LogLevel, DEFAULT_LOG_LEVEL_KEY};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install a global subscriber writing through the test harness capture.
///
/// Only the first call in a test binary takes effect; later calls are
/// ignored.
pub fn init_test_tracing(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Install the test subscriber at the level found under
/// `Logging:LogLevel:Default`, or `default` when unset or unknown.
pub fn init_test_tracing_from(configuration: &Configuration, default: Level) -> Level {
    let level = level_from_configuration(configuration).unwrap_or(default);
    init_test_tracing(level);
    level
}

/// Level stored under `Logging:LogLevel:Default`.
pub fn level_from_configuration(configuration: &Configuration) -> Option<Level> {
    parse_level(configuration.get(DEFAULT_LOG_LEVEL_KEY)?)
}

/// Accepts both tracing names (`warn`) and settings names (`Warning`).
/// `Critical` maps to `ERROR`; `None` and anything unknown yield nothing.
pub fn parse_level(value: &str) -> Option<Level> {
    LogLevel::parse(value)?.to_tracing()
}
