//! Logging bootstrap
//!
//! Installs the global tracing subscriber. `LOG_LEVEL` (via the resolved
//! configuration) seeds the filter; `RUST_LOG` still wins when set so
//! operators can scope modules the usual way.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber with the given default level
///
/// Calling twice is harmless; the second installation is ignored.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
