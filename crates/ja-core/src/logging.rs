//! Diagnostic logging to stderr.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global subscriber. Later calls are no-ops.
///
/// Falls back to `info` if the configured filter does not parse.
pub fn init(config: &LogConfig) {
    let filter = build_filter(&config.resolve_filter());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("warning: invalid log filter {directive:?}: {e}");
        EnvFilter::new("info")
    })
}
