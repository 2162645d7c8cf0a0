//! Logging setup on top of `tracing-subscriber`.
use crate::config::EngineConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over the
/// configured filter. Does nothing if a subscriber is already installed.
pub fn init(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Subscriber for tests, writing through the test harness.
pub fn init_test() {
    let _ = fmt().with_env_filter(EnvFilter::new("trace")).with_test_writer().try_init();
}
