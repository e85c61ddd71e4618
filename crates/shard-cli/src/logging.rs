//! Structured logging setup for the CLI binary.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global `tracing` subscriber. `verbosity` follows the
/// repeated `-v` flag: 0 = info, 1 = debug, 2+ = trace. `RUST_LOG`
/// overrides this when set, matching the teacher's `setup_logging`.
pub fn init(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt().with_env_filter(filter).try_init();
}
