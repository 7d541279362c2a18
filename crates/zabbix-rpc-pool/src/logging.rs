//! One-line `tracing` setup for binaries, examples, and tests that want it.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber that logs to stderr at `level`
/// (or whatever `RUST_LOG` overrides it with). Safe to call more than
/// once; subsequent calls are no-ops.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
