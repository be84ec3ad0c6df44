//! Subscriber setup for hosts that embed the audit core.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"` or
/// `"tide_audit=debug"`) is used. Fails if a global subscriber is already
/// installed.
pub fn init_logging(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}
