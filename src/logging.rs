//! Structured logging setup.
//!
//! The library only emits [tracing] events; installing a subscriber is the embedding program's
//! job. [init] installs the one the `awx-provider` binary uses.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, in [EnvFilter] syntax.
pub const LOG_VAR: &str = "AWX_PROVIDER_LOG";

/// The filter used when [LOG_VAR] is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Builds the filter from [LOG_VAR], falling back to [DEFAULT_FILTER].
pub fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs a formatting subscriber that writes to standard error.
///
/// Standard output is left for command output. Does nothing if a global subscriber is already
/// installed.
pub fn init() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter())
        .try_init()
        .ok();
}

/// Installs a subscriber for tests, writing through the test harness's capture.
#[cfg(test)]
pub fn init_test() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(filter())
        .try_init()
        .ok();
}
