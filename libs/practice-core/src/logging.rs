//! Tracing setup for hosts embedding the engine.
//!
//! The library only emits events; nothing is printed until a host installs
//! a subscriber, either its own or one of these.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a compact subscriber at `info`, overridable through `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already set.
pub fn init() -> bool {
    init_with_level("info")
}

/// Same as [`init`] with a different default level, e.g. `"practice_core=debug"`.
pub fn init_with_level(default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init()
        .is_ok()
}

/// Route engine events into the test harness output.
#[cfg(test)]
pub(crate) fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("practice_core=debug"))
        .try_init();
}
