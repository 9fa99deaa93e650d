//! Logging init: structured `tracing` output on stderr.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,spotq=debug";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
