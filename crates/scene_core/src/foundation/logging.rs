//! Logging utilities and structured logging support
//!
//! The library only emits through the `log` facade; binaries and tests pick
//! the backend.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// `RUST_LOG` wins over `default_filter` (e.g. `"info"`). Safe to call more
/// than once; later calls are ignored.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Initialize logging for unit tests (output captured by the test harness)
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
