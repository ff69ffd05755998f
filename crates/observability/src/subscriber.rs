//! `tracing` subscriber installation.
//!
//! Filtering follows `RUST_LOG`; without it everything at `info` and above is
//! emitted. Both initializers are safe to call more than once: only the first
//! successful call installs a subscriber.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Filter from `RUST_LOG`, or `fallback` when unset or unparsable.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// JSON lines with timestamps, for services and log shipping.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Human-readable output on stderr, for the interactive CLI.
///
/// Logs go to stderr so they do not interleave with snapshots printed on
/// stdout.
pub fn init_pretty() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
