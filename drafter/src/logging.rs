//! Diagnostic tracing for the drafter CLI.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. Command results
//! (JSON on stdout) and `--events` lines are product output and are never
//! filtered by it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=drafter=debug drafter draft --preset dpa --prompt "Draft an audit clause"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
