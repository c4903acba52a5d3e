//! Logging utilities
//!
//! The library only emits through the `log` facade; installing a logger is
//! left to the host application.

pub use log::{debug, error, info, trace, warn};

/// Initialize `env_logger` (honours `RUST_LOG`)
pub fn init() {
    env_logger::init();
}

/// Initialize logging for tests, ignoring repeated initialisation
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
