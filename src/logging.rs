//! Logging initialization.
//!
//! Uses `tracing` with `tracing-subscriber`; the log level is taken from
//! the `RUST_LOG` environment variable (default: info). Library code only
//! emits events; embedding binaries call [`init`] once at startup.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global subscriber.
///
/// # Environment
/// * `RUST_LOG` - level filter (e.g. `debug` or `stowage=trace`)
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Initialize logging for tests, capturing output per test.
///
/// Safe to call repeatedly; only the first call installs a subscriber.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
