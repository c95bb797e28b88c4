//! Log output for the CLI.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Picks the filter: `RUST_LOG` when set and valid, `configured` otherwise.
pub fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(ideahub_core::config::DEFAULT_LOG_LEVEL))
}

/// Installs the global subscriber writing to stderr.
///
/// Safe to call once per process; later calls are ignored.
pub fn init(configured: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(configured))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
