//! Tracing/logging initialization.
//!
//! Library code only emits `tracing` events; binaries decide where they go.

use tracing_subscriber::EnvFilter;

/// Initialize human-readable logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(false);
}

/// Initialize logging, optionally as JSON lines. The filter comes from
/// `RUST_LOG` and defaults to `info`.
pub fn init_with(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
