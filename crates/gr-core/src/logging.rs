//! Logging setup

use crate::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns false if a
/// subscriber was already installed.
pub fn init(level: LogLevel) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter())),
        )
        .with_target(false)
        .try_init()
        .is_ok()
}
