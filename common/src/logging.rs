use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the process-wide tracing subscriber. Safe to call more than
/// once (e.g. from both a binary and its integration tests); later calls
/// are no-ops.
pub fn init() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}
