//! Diagnostic logging initialization.
//!
//! Logs go to stderr so they never mix with the captured command output the
//! CLI prints on stdout. The level comes from the config file unless
//! `RUST_LOG` is set, which always wins:
//!
//! - `RUST_LOG=debug` - include every approval decision
//! - `RUST_LOG=warn` - rejections and audit failures only

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter: `RUST_LOG` if present and valid, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second subscriber is dropped.
pub fn init_logging(default_level: &str) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    let installed = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer)
        .try_init();

    if installed.is_ok() {
        tracing::debug!("logging initialized at level {}", default_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging("warn");
        init_logging("debug");
    }
}
