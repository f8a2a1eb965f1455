//! Logging init: plain text on stderr, filtered by `RUST_LOG` or verbosity.

use tracing_subscriber::EnvFilter;

/// Default filter for a number of `-v` flags.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Initialize logging to stderr. `RUST_LOG` takes precedence over `verbosity`.
/// Calling it twice is harmless, the first subscriber stays in place.
pub fn init_logging(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
